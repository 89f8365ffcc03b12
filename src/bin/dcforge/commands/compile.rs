use std::path::Path;

use anyhow::{Context, Result};

use decoy_forge::chem::graph::Molecule;
use decoy_forge::compile::compile_chunk;
use decoy_forge::io::{Format, RecordWriter};

use crate::cli::CompileArgs;
use crate::display::{Context as DisplayContext, Progress, print_compile_report};
use crate::io::file_name;
use crate::logging::{self, LogSettings};

const DEFAULT_LOG_FILE: &str = "compile.log";

pub fn run_compile(args: CompileArgs, ctx: DisplayContext) -> Result<()> {
    let log_file = args
        .log
        .log_file
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE).to_path_buf());
    logging::init(&LogSettings::new(
        args.log.verbose,
        !args.log.no_log,
        &log_file,
    ))?;

    let mut progress = Progress::new(ctx.interactive, 1);

    let mut main = RecordWriter::create(&args.output, Format::Summaries)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut unreconstructed = RecordWriter::create(&args.unreconstructed, Format::Summaries)
        .with_context(|| format!("Failed to create {}", args.unreconstructed.display()))?;

    progress.step("Compiling summaries", None);
    let tracker = progress.tracker();
    let report = compile_chunk::<Molecule, _, _>(
        &args.chunk,
        &mut main,
        &mut unreconstructed,
        || tracker.inc(),
    )
    .with_context(|| format!("Failed to compile chunk: {}", args.chunk.display()))?;

    progress.complete_step(
        "Compiling summaries",
        &[
            format!(
                "Read {} records from {}",
                report.records,
                file_name(&args.chunk)
            ),
            format!(
                "Write {} summaries → {}",
                report.summaries,
                file_name(&args.output)
            ),
            format!(
                "Write {} summaries → {}",
                report.unreconstructed,
                file_name(&args.unreconstructed)
            ),
        ],
    );

    if ctx.interactive {
        print_compile_report(&report);
    }
    progress.finish("Compile complete");

    Ok(())
}
