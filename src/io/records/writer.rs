use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::io::{Format, error::Error};

/// Destination for batches of finished records.
pub trait RecordSink<T> {
    /// Appends `records`, returning how many were written.
    fn write_batch(&mut self, records: &[T]) -> Result<usize, Error>;
}

impl<T: Clone> RecordSink<T> for Vec<T> {
    fn write_batch(&mut self, records: &[T]) -> Result<usize, Error> {
        self.extend_from_slice(records);
        Ok(records.len())
    }
}

/// Append-only writer for a records file.
///
/// Each batch is encoded in memory and written with a single `write_all` on
/// a file opened in append mode, so batches from concurrent writers land
/// whole and never interleave line fragments.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    path: PathBuf,
    format: Format,
}

impl RecordWriter {
    pub fn new(path: impl AsRef<Path>, format: Format) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    /// Creates or truncates the file and returns a writer for it.
    pub fn create(path: impl AsRef<Path>, format: Format) -> Result<Self, Error> {
        let path = path.as_ref();
        File::create(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(path, format))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encode<T: Serialize>(&self, records: &[T]) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| Error::serialize(self.format, e.to_string()))?;
            buf.push(b'\n');
        }
        Ok(buf)
    }

    pub fn append_all<T: Serialize>(&self, records: &[T]) -> Result<usize, Error> {
        if records.is_empty() {
            return Ok(0);
        }
        let buf = self.encode(records)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;
        file.write_all(&buf).map_err(|e| Error::io(&self.path, e))?;
        file.flush().map_err(|e| Error::io(&self.path, e))?;
        Ok(records.len())
    }
}

impl<T: Serialize> RecordSink<T> for RecordWriter {
    fn write_batch(&mut self, records: &[T]) -> Result<usize, Error> {
        self.append_all(records)
    }
}
