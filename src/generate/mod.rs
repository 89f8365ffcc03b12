//! Decoy generation.
//!
//! For every source reaction of a shard the [`BatchWorker`] extracts strict
//! rules ([`rules`]), applies them and the shared template library
//! ([`apply`]), and classifies each candidate against what the reaction has
//! already produced ([`classify`]). Shards are independent: they read
//! disjoint slices of the input and append whole batches to one output file.

pub mod apply;
pub mod classify;
mod config;
mod error;
pub mod prepare;
pub mod rules;
pub mod worker;

pub use apply::{Admission, CapPolicy, RuleApplicationEngine, RuleCaps};
pub use classify::{DecoyClassifier, DocEntry, GenerationDoc};
pub use config::{CANDIDATE_HEADROOM, GenerationLimits, ShardPlan, WorkerConfig};
pub use error::{ConfigError, Error};
pub use rules::extract_rules;
pub use worker::{BatchWorker, ReactionOutcome, Rejection, WorkerReport};

use rayon::prelude::*;

use crate::chem::StructureOps;
use crate::io::{Format, RecordDataset, RecordWriter, load_rule_library};
use crate::model::reaction::{ReactionRecord, RuleTemplate};

/// Inputs shared read-only by every shard of a run.
struct RunInputs<S: StructureOps> {
    dataset: RecordDataset<ReactionRecord<S::Molecule>>,
    library: Vec<RuleTemplate<S::Query>>,
    plan: ShardPlan,
}

impl<S: StructureOps> RunInputs<S> {
    fn open(config: &WorkerConfig) -> Result<Self, Error> {
        config.validate()?;
        let dataset = RecordDataset::open(&config.input, Format::Reactions)?;
        let library = load_rule_library(&config.rules, config.template_count)?;
        let plan = ShardPlan::new(dataset.len(), config.batch);
        Ok(Self {
            dataset,
            library,
            plan,
        })
    }

    fn run_shard(
        &self,
        ops: &S,
        config: &WorkerConfig,
        shard: usize,
        on_reaction: impl FnMut(),
    ) -> Result<WorkerReport, Error> {
        let range = self.plan.range(shard)?;
        let records = self.dataset.read_range(range)?;
        let mut writer = RecordWriter::new(&config.output, Format::Reactions);
        BatchWorker::new(ops, shard, config.limits, &self.library, config.batch).run(
            records,
            &mut writer,
            on_reaction,
        )
    }
}

/// How `config` splits its input into shards.
pub fn plan(config: &WorkerConfig) -> Result<ShardPlan, Error> {
    config.validate()?;
    let dataset = RecordDataset::<serde_json::Value>::open(&config.input, Format::Reactions)?;
    Ok(ShardPlan::new(dataset.len(), config.batch))
}

/// Runs a single shard, as a standalone worker process would.
pub fn run_shard<S: StructureOps>(
    ops: &S,
    config: &WorkerConfig,
    shard: usize,
    on_reaction: impl FnMut(),
) -> Result<WorkerReport, Error> {
    RunInputs::<S>::open(config)?.run_shard(ops, config, shard, on_reaction)
}

/// Runs every shard on a pool of `jobs` threads (`0` picks the core count).
///
/// Each shard is an independent worker with its own buffer; they share only
/// the read-only inputs and the append-only output file.
pub fn run_all<S>(
    ops: &S,
    config: &WorkerConfig,
    jobs: usize,
    on_reaction: impl Fn() + Sync,
) -> Result<Vec<WorkerReport>, Error>
where
    S: StructureOps + Sync,
    S::Molecule: Send,
    S::Query: Sync,
{
    let inputs = RunInputs::<S>::open(config)?;
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    pool.install(|| {
        (0..inputs.plan.shard_count())
            .into_par_iter()
            .map(|shard| inputs.run_shard(ops, config, shard, &on_reaction))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::fixtures::*;
    use crate::chem::graph::{GraphChemistry, Molecule};
    use crate::io::read_records;
    use crate::model::types::ReactionType;
    use std::path::Path;

    fn write_inputs(dir: &Path, reactions: usize) -> WorkerConfig {
        let input = dir.join("reactions.jsonl");
        let rules = dir.join("rules.jsonl");
        let records: Vec<ReactionRecord<Molecule>> = (0..reactions)
            .map(|i| substitution(&format!("r{i}")))
            .collect();
        RecordWriter::new(&input, Format::Reactions)
            .append_all(&records)
            .unwrap();
        RecordWriter::new(&rules, Format::Rules)
            .append_all(&[halogen_transfer_template(7)])
            .unwrap();

        WorkerConfig {
            input,
            rules,
            output: dir.join("decoys.jsonl"),
            batch: 2,
            ..Default::default()
        }
    }

    #[test]
    fn single_shard_writes_its_slice() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), 3);
        let plan = plan(&config).unwrap();
        assert_eq!((plan.len(), plan.shard_count()), (3, 2));

        let chem = GraphChemistry::new();
        let report = run_shard(&chem, &config, 1, || {}).unwrap();
        assert_eq!(report.name, "Worker-1");
        assert_eq!(report.processed, 1);
        assert_eq!(report.written, 2);

        let written: Vec<ReactionRecord<Molecule>> = read_records(&config.output, Format::Reactions)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(written.iter().all(|r| r.reaction_id() == "r2"));
    }

    #[test]
    fn shard_outside_plan_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), 3);
        let chem = GraphChemistry::new();
        assert!(matches!(
            run_shard(&chem, &config, 5, || {}),
            Err(Error::Config(ConfigError::ShardOutOfRange { shard: 5, shards: 2 }))
        ));
    }

    #[test]
    fn all_shards_cover_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), 5);
        let chem = GraphChemistry::new();

        let reports = run_all(&chem, &config, 2, || {}).unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports.iter().map(|r| r.processed).sum::<usize>(), 5);
        assert_eq!(reports.iter().map(|r| r.recovered).sum::<usize>(), 5);

        let written: Vec<ReactionRecord<Molecule>> = read_records(&config.output, Format::Reactions)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(written.len(), 10);
        let reconstructed = written
            .iter()
            .filter(|r| r.reaction_type() == Some(ReactionType::Reconstructed))
            .count();
        assert_eq!(reconstructed, 5);
    }

    #[test]
    fn invalid_config_fails_before_reading() {
        let config = WorkerConfig {
            input: "missing.jsonl".into(),
            batch: 0,
            ..Default::default()
        };
        let chem = GraphChemistry::new();
        assert!(matches!(
            run_shard(&chem, &config, 0, || {}),
            Err(Error::Config(ConfigError::ZeroBatch))
        ));
    }
}
