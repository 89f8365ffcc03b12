use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Env, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Mirror every event to stdout.
    pub verbose: bool,
    /// Append events to this file.
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub fn new(verbose: bool, log: bool, file: &Path) -> Self {
        Self {
            verbose,
            file: log.then(|| file.to_path_buf()),
        }
    }
}

/// Writes each formatted event to the log file and, in verbose mode, stdout.
struct Tee {
    file: Option<File>,
    stdout: bool,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = &mut self.file {
            file.write_all(buf)?;
        }
        if self.stdout {
            io::stdout().lock().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        if self.stdout {
            io::stdout().flush()?;
        }
        Ok(())
    }
}

/// Installs the global logger. `RUST_LOG` overrides the default `info` filter.
pub fn init(settings: &LogSettings) -> Result<()> {
    let file = match &settings.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?,
        ),
        None => None,
    };
    let tee = Tee {
        file,
        stdout: settings.verbose,
    };

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:<5}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(tee)))
        .try_init()
        .context("Failed to initialize logger")
}
