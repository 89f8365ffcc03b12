use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dcforge",
    about = "Decoy reaction generation and deduplication",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate decoys for every shard of a reaction dataset
    #[command(visible_alias = "g")]
    Generate(GenerateArgs),

    /// Run a single shard of a saved generation config
    #[command(visible_alias = "w")]
    Worker(WorkerArgs),

    /// Deduplicate generated reactions by canonical signature
    #[command(visible_alias = "m")]
    Merge(MergeArgs),

    /// Compile a merged chunk into per-reaction summaries
    #[command(visible_alias = "c")]
    Compile(CompileArgs),
}

impl Command {
    pub fn quiet(&self) -> bool {
        match self {
            Command::Generate(args) => args.log.quiet,
            Command::Worker(args) => args.quiet,
            Command::Merge(args) => args.log.quiet,
            Command::Compile(args) => args.log.quiet,
        }
    }
}

/// Logging and progress options shared by all commands.
#[derive(Args)]
#[command(next_help_heading = "Logging")]
pub struct LogOptions {
    /// Mirror every log event to stdout
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not write a log file
    #[arg(long)]
    pub no_log: bool,

    /// Log file, appended to (default depends on the command)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Reaction dataset (JSON lines)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Rule template library (JSON lines)
    #[arg(value_name = "RULES")]
    pub rules: PathBuf,

    /// Output file for generated reactions (replaced if present)
    #[arg(short, long, value_name = "FILE", default_value = "decoys.jsonl")]
    pub output: PathBuf,

    /// Worker threads (0 = one per core)
    #[arg(short, long, value_name = "N", default_value = "0")]
    pub jobs: usize,

    /// Reactions per shard
    #[arg(long, value_name = "N", default_value = "10000")]
    pub batch: usize,

    /// Maximum decoys accepted per generation pass
    #[arg(short = 'n', long = "max-decoys", value_name = "N", default_value = "50")]
    pub max_decoys: usize,

    /// Maximum candidates kept from a single rule
    #[arg(short, long, value_name = "N", default_value = "5")]
    pub limit: usize,

    /// Use only the first N templates of the library
    #[arg(long, value_name = "N", default_value = "1000")]
    pub count: usize,

    /// Where the run configuration is saved for `dcforge worker`
    #[arg(long, value_name = "FILE", default_value = "worker_config.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub log: LogOptions,
}

#[derive(Args)]
pub struct WorkerArgs {
    /// Configuration saved by `dcforge generate`
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Zero-based shard index
    #[arg(value_name = "SHARD")]
    pub shard: usize,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Concatenated generation output (JSON lines)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Records held in memory before spilling to disk
    #[arg(long, value_name = "N", default_value = "100000")]
    pub dump_size: usize,

    /// Base path of the chunk files
    #[arg(long, value_name = "PATH", default_value = "merged")]
    pub chunk_base: PathBuf,

    /// Resume an interrupted run after this many records
    #[arg(long, value_name = "K")]
    pub resume_from: Option<usize>,

    /// Also write the deduplicated reactions as a flat dataset
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    #[command(flatten)]
    pub log: LogOptions,
}

#[derive(Args)]
pub struct CompileArgs {
    /// Final chunk of a merge run
    #[arg(value_name = "CHUNK")]
    pub chunk: PathBuf,

    /// Summaries of reactions with a reconstructed original
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Summaries of reactions without one
    #[arg(long, value_name = "FILE", default_value = "unreconstructed.jsonl")]
    pub unreconstructed: PathBuf,

    #[command(flatten)]
    pub log: LogOptions,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["dcforge", "generate", "in.jsonl", "rules.jsonl"]).unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.output, PathBuf::from("decoys.jsonl"));
        assert_eq!(args.batch, 10_000);
        assert_eq!((args.max_decoys, args.limit, args.count), (50, 5, 1000));
        assert!(!args.log.verbose && !args.log.no_log);
    }

    #[test]
    fn merge_accepts_resume_and_export() {
        let cli = Cli::try_parse_from([
            "dcforge",
            "merge",
            "decoys.jsonl",
            "--dump-size",
            "500",
            "--resume-from",
            "1000",
            "--export",
            "clean.jsonl",
            "-q",
        ])
        .unwrap();
        assert!(cli.command.quiet());
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.dump_size, 500);
        assert_eq!(args.resume_from, Some(1000));
        assert_eq!(args.export, Some(PathBuf::from("clean.jsonl")));
    }

    #[test]
    fn compile_requires_output() {
        assert!(Cli::try_parse_from(["dcforge", "compile", "merged_10"]).is_err());
    }
}
