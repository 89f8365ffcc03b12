use std::path::Path;

use anyhow::{Context, Result};

use decoy_forge::ReactionRecord;
use decoy_forge::chem::graph::{GraphChemistry, Molecule};
use decoy_forge::io::{Format, read_records};
use decoy_forge::merge::{MergeOptions, MergePipeline, export_chunk};

use crate::cli::MergeArgs;
use crate::display::{Context as DisplayContext, Progress, print_merge_report};
use crate::io::file_name;
use crate::logging::{self, LogSettings};

const DEFAULT_LOG_FILE: &str = "cleaning.log";

pub fn run_merge(args: MergeArgs, ctx: DisplayContext) -> Result<()> {
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

    let total_steps = if args.export.is_some() { 2 } else { 1 };
    let mut progress = Progress::new(ctx.interactive, total_steps);

    let chem = GraphChemistry::new();
    let options = MergeOptions {
        dump_size: args.dump_size,
        chunk_base: args.chunk_base.clone(),
        resume_from: args.resume_from,
    };
    let pipeline = MergePipeline::new(&chem, options).context("Invalid merge settings")?;

    progress.step("Deduplicating reactions", None);
    let tracker = progress.tracker();
    let records = read_records::<ReactionRecord<Molecule>>(&args.input, Format::Reactions)
        .with_context(|| format!("Failed to open reactions: {}", args.input.display()))?;
    let report = pipeline
        .run(records, || tracker.inc())
        .context("Merge failed")?;

    let mut substeps = vec![format!(
        "Read {} records from {}",
        report.records_seen,
        file_name(&args.input)
    )];
    if let Some(resume) = args.resume_from {
        substeps.push(format!("Resume after record {resume}"));
    }
    substeps.push(format!(
        "Keep {} records → {}",
        report.kept,
        file_name(&report.chunk_path)
    ));
    progress.complete_step("Deduplicating reactions", &substeps);

    if let Some(dest) = &args.export {
        progress.step("Exporting dataset", None);
        let written = export_chunk::<Molecule>(&report.chunk_path, dest)
            .with_context(|| format!("Failed to export chunk to {}", dest.display()))?;
        progress.complete_step(
            "Exporting dataset",
            &[format!("Write {written} records → {}", file_name(dest))],
        );
    }

    if ctx.interactive {
        print_merge_report(&report);
    }
    progress.finish("Merge complete");

    Ok(())
}
