use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    let msg = err.to_string();
    for line in wrap(&msg, 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 59) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
        source = cause.source();
    }

    if let Some(hints) = HintCollector::collect(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
}

impl HintCollector {
    fn collect(err: &Error) -> Option<Vec<String>> {
        let mut collector = Self { hints: Vec::new() };

        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<decoy_forge::generate::Error>() {
                collector.collect_generate_hints(e);
            } else if let Some(e) = cause.downcast_ref::<decoy_forge::generate::ConfigError>() {
                collector.collect_config_hints(e);
            } else if let Some(e) = cause.downcast_ref::<decoy_forge::merge::Error>() {
                collector.collect_merge_hints(e);
            } else if let Some(e) = cause.downcast_ref::<decoy_forge::io::Error>() {
                collector.collect_io_hints(e);
            }
            if !collector.hints.is_empty() {
                break;
            }
        }

        if collector.hints.is_empty() {
            collector.collect_fallback_hints(err);
        }

        if collector.hints.is_empty() {
            None
        } else {
            Some(collector.hints)
        }
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn collect_generate_hints(&mut self, err: &decoy_forge::generate::Error) {
        use decoy_forge::generate::Error as GenerateError;

        match err {
            GenerateError::Config(e) => self.collect_config_hints(e),
            GenerateError::Io(e) => self.collect_io_hints(e),
            GenerateError::ThreadPool(_) => {
                self.add("The worker thread pool could not be started");
                self.add("Try a smaller --jobs value");
            }
        }
    }

    fn collect_config_hints(&mut self, err: &decoy_forge::generate::ConfigError) {
        use decoy_forge::generate::ConfigError;

        match err {
            ConfigError::ZeroBatch
            | ConfigError::ZeroLimit
            | ConfigError::ZeroMaxDecoys
            | ConfigError::ZeroTemplateCount => {
                self.add("Batch size, limits, and template count must all be positive");
            }
            ConfigError::ShardOutOfRange { shards, .. } => {
                self.add(format!("Valid shard indices are 0 to {}", shards.saturating_sub(1)));
                self.add("The shard count is the dataset size divided by --batch, rounded up");
            }
            ConfigError::Parse(_) => {
                self.add("The worker config is not valid TOML or is missing fields");
                self.add("Re-create it with `dcforge generate`");
            }
            ConfigError::Serialize(_) => {
                self.add("The worker config could not be written as TOML");
            }
        }
    }

    fn collect_merge_hints(&mut self, err: &decoy_forge::merge::Error) {
        use decoy_forge::merge::Error as MergeError;

        match err {
            MergeError::Io(e) => self.collect_io_hints(e),
            MergeError::Chunk { .. } => {
                self.add("A chunk file from an earlier spill is damaged");
                self.add("Resume from the last intact chunk with --resume-from");
            }
            MergeError::ZeroDumpSize => {
                self.add("--dump-size must be at least 1");
            }
        }
    }

    fn collect_io_hints(&mut self, err: &decoy_forge::io::Error) {
        use decoy_forge::io::Error as IoError;

        match err {
            IoError::Io { source, .. } => self.collect_std_io_hints(source),
            IoError::Parse { format, line, .. } => {
                self.add(format!("A {format} near line {line} could not be decoded"));
                self.add("Every line must hold one complete JSON document");
            }
            IoError::Serialize { .. } => {
                self.add("A record could not be encoded as JSON");
            }
            IoError::OutOfRange { len, .. } => {
                self.add(format!("The dataset holds only {len} records"));
                self.add("Check that the input has not changed since the config was saved");
            }
        }
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the path spelling and ensure the file exists");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("Check file permissions with `ls -la`");
            }

            ErrorKind::StorageFull | ErrorKind::WriteZero => {
                self.add("Failed to write data (disk full?)");
                self.add("Merge chunks need room for two copies of the dataset");
            }

            _ => {
                self.add("I/O operation failed");
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("logger") {
            self.add("Logging was already initialized in this process");
            return;
        }

        if msg.contains("no such file") || msg.contains("not found") {
            self.add("Check that the file path is correct");
            self.add("Verify the file exists and is readable");
        }
    }
}

fn error_chain_text(err: &Error) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}
