use std::path::Path;

use anyhow::{Context, Result};

use decoy_forge::chem::graph::GraphChemistry;
use decoy_forge::generate::{self, GenerationLimits, WorkerConfig};

use crate::cli::{GenerateArgs, WorkerArgs};
use crate::display::{Context as DisplayContext, Progress, print_worker_reports};
use crate::io::{file_name, remove_stale};
use crate::logging::{self, LogSettings};

const TOTAL_STEPS: u8 = 2;

const DEFAULT_LOG_FILE: &str = "generate_decoys.log";

pub fn run_generate(args: GenerateArgs, ctx: DisplayContext) -> Result<()> {
    let config = build_config(&args);
    config.validate().context("Invalid generation settings")?;
    let log_reset = reset_log(&config)?;
    logging::init(&log_settings(&config))?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Preparing run", None);
    let removed = remove_stale(&config.output)?;
    config
        .save(&args.config)
        .with_context(|| format!("Failed to save worker config: {}", args.config.display()))?;
    let plan = generate::plan(&config).context("Failed to index the reaction dataset")?;

    let mut substeps = vec![
        format!(
            "{} reactions in {} shards of up to {}",
            plan.len(),
            plan.shard_count(),
            config.batch
        ),
        format!("Save worker config → {}", file_name(&args.config)),
    ];
    if removed {
        substeps.push(format!("Remove stale {}", file_name(&config.output)));
    }
    if log_reset {
        substeps.push(format!("Start fresh {}", file_name(&config.log_file)));
    }
    progress.complete_step("Preparing run", &substeps);

    progress.step("Generating decoys", Some(plan.len() as u64));
    let tracker = progress.tracker();
    let chem = GraphChemistry::new();
    let reports = generate::run_all(&chem, &config, args.jobs, || tracker.inc())
        .context("Decoy generation failed")?;

    let written: usize = reports.iter().map(|r| r.written).sum();
    progress.complete_step(
        "Generating decoys",
        &[format!(
            "Write {written} records → {}",
            file_name(&config.output)
        )],
    );

    if ctx.interactive {
        print_worker_reports(&reports);
    }
    progress.finish("Generation complete");

    Ok(())
}

pub fn run_worker(args: WorkerArgs, ctx: DisplayContext) -> Result<()> {
    let config = WorkerConfig::load(&args.config)
        .with_context(|| format!("Failed to load worker config: {}", args.config.display()))?;
    logging::init(&log_settings(&config))?;

    let mut progress = Progress::new(ctx.interactive, 1);
    progress.step(&format!("Running shard {}", args.shard), None);
    let tracker = progress.tracker();

    let chem = GraphChemistry::new();
    let report = generate::run_shard(&chem, &config, args.shard, || tracker.inc())
        .with_context(|| format!("Shard {} failed", args.shard))?;

    progress.complete_step(
        &format!("Running shard {}", args.shard),
        &[
            format!("{} reactions, {} recovered", report.processed, report.recovered),
            format!(
                "Append {} records → {}",
                report.written,
                file_name(&config.output)
            ),
        ],
    );

    if ctx.interactive {
        print_worker_reports(std::slice::from_ref(&report));
    }
    progress.finish("Shard complete");

    Ok(())
}

fn build_config(args: &GenerateArgs) -> WorkerConfig {
    WorkerConfig {
        input: args.input.clone(),
        rules: args.rules.clone(),
        output: args.output.clone(),
        batch: args.batch,
        template_count: Some(args.count),
        verbose: args.log.verbose,
        log: !args.log.no_log,
        log_file: args
            .log
            .log_file
            .clone()
            .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE).to_path_buf()),
        limits: GenerationLimits {
            max_decoys: args.max_decoys,
            limit: args.limit,
        },
    }
}

/// Each generate run starts its log file over; shard workers append to it.
fn reset_log(config: &WorkerConfig) -> Result<bool> {
    if config.log {
        remove_stale(&config.log_file)
    } else {
        Ok(false)
    }
}

fn log_settings(config: &WorkerConfig) -> LogSettings {
    LogSettings::new(config.verbose, config.log, &config.log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_log(path: &Path, log: bool) -> WorkerConfig {
        WorkerConfig {
            log,
            log_file: path.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn previous_log_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generate_decoys.log");
        std::fs::write(&path, "old run\n").unwrap();

        assert!(reset_log(&config_with_log(&path, true)).unwrap());
        assert!(!path.exists());
        assert!(!reset_log(&config_with_log(&path, true)).unwrap());
    }

    #[test]
    fn log_is_kept_when_logging_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generate_decoys.log");
        std::fs::write(&path, "old run\n").unwrap();

        assert!(!reset_log(&config_with_log(&path, false)).unwrap());
        assert!(path.exists());
    }
}
