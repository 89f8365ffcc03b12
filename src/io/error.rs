use std::path::{Path, PathBuf};

use super::Format;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at line ~{line})")]
    Parse {
        format: Format,
        line: usize,
        details: String,
    },

    #[error("failed to serialize {format} data: {details}")]
    Serialize { format: Format, details: String },

    #[error("record range {start}..{end} is out of bounds for a dataset of {len} records")]
    OutOfRange { start: usize, end: usize, len: usize },
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }

    pub fn serialize(format: Format, details: impl Into<String>) -> Self {
        Self::Serialize {
            format,
            details: details.into(),
        }
    }

    /// Whether the failure concerns one malformed record rather than the file.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
