use std::time::{Duration, Instant};

use log::{info, warn};

use super::classify::{DecoyClassifier, GenerationDoc};
use super::config::GenerationLimits;
use super::error::Error;
use super::prepare::{is_radical_free, remove_reagents, split_containers};
use super::rules::{RULE_REACTANTS, extract_rules};
use crate::chem::StructureOps;
use crate::io::RecordSink;
use crate::model::reaction::{ReactionRecord, RuleTemplate};
use crate::model::types::ReactionType;

/// Shards smaller than this are only written out once, at the end.
pub const LARGE_SHARD_THRESHOLD: usize = 10_000;

/// Large shards flush every `batch / FLUSH_DIVISOR` reactions.
pub const FLUSH_DIVISOR: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    batch: usize,
}

impl FlushPolicy {
    pub fn new(batch: usize) -> Self {
        Self { batch }
    }

    /// Whether pending output is written after the `processed`-th reaction.
    /// The end-of-shard flush is not covered here.
    pub fn should_flush(&self, processed: usize) -> bool {
        if self.batch < LARGE_SHARD_THRESHOLD {
            return false;
        }
        let step = self.batch / FLUSH_DIVISOR;
        processed % step == 0 && processed != self.batch
    }
}

/// Why a source reaction was not used for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Reagent removal left no usable transformation.
    Reagents,
    /// Splitting left a reactant count other than two.
    ReactantCount(usize),
    /// The reaction involves a radical atom.
    Radical,
    /// The reaction could not be composed.
    Composition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReactionOutcome<M> {
    Rejected(Rejection),
    /// No rule regenerated the source; its candidates are dropped.
    NotRecovered,
    /// The source was regenerated; carries every generated record.
    Recovered(Vec<ReactionRecord<M>>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub name: String,
    pub processed: usize,
    pub rejected: usize,
    pub unreadable: usize,
    pub recovered: usize,
    pub not_recovered: usize,
    pub written: usize,
    pub elapsed: Duration,
}

/// Generates decoys for one contiguous shard of the input dataset.
pub struct BatchWorker<'a, S: StructureOps> {
    ops: &'a S,
    name: String,
    limits: GenerationLimits,
    library: &'a [RuleTemplate<S::Query>],
    flush: FlushPolicy,
}

impl<'a, S: StructureOps> BatchWorker<'a, S> {
    pub fn new(
        ops: &'a S,
        shard: usize,
        limits: GenerationLimits,
        library: &'a [RuleTemplate<S::Query>],
        batch: usize,
    ) -> Self {
        Self {
            ops,
            name: format!("Worker-{shard}"),
            limits,
            library,
            flush: FlushPolicy::new(batch),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process_reaction(
        &self,
        reaction: ReactionRecord<S::Molecule>,
    ) -> ReactionOutcome<S::Molecule> {
        let Some(reaction) = remove_reagents(self.ops, reaction) else {
            return ReactionOutcome::Rejected(Rejection::Reagents);
        };
        let mut reaction = split_containers(self.ops, reaction);
        if reaction.reactants.len() != RULE_REACTANTS {
            return ReactionOutcome::Rejected(Rejection::ReactantCount(reaction.reactants.len()));
        }
        let Ok(composition) = self.ops.compose(&reaction) else {
            return ReactionOutcome::Rejected(Rejection::Composition);
        };
        if !is_radical_free(&composition) {
            return ReactionOutcome::Rejected(Rejection::Radical);
        }

        reaction.set_type(ReactionType::Initial);
        let id = reaction.reaction_id().to_owned();
        let mut doc = GenerationDoc::new(composition.signature, reaction.clone());
        let classifier = DecoyClassifier::new(self.ops, self.limits);

        match extract_rules(self.ops, &reaction) {
            Ok(rules) if !rules.is_empty() => {
                classifier.generate(&reaction, &rules, &mut doc);
            }
            Ok(_) => warn!("Failed to get strict templates for reaction with ID {id}"),
            Err(e) => warn!("Failed to get strict templates for reaction with ID {id}: {e}"),
        }
        classifier.generate(&reaction, self.library, &mut doc);

        if !doc.is_recovered() || !doc.has_reconstructed() {
            info!("Reaction with ID {id} was not recovered");
            return ReactionOutcome::NotRecovered;
        }
        info!("Reaction with ID {id} was successfully recovered");
        ReactionOutcome::Recovered(doc.into_generated())
    }

    /// Processes `records` in order, appending recovered output to `sink`.
    ///
    /// Unreadable records are skipped; a failing read or write ends the
    /// shard. `on_reaction` runs once per input record.
    pub fn run<I, W>(
        &self,
        records: I,
        sink: &mut W,
        mut on_reaction: impl FnMut(),
    ) -> Result<WorkerReport, Error>
    where
        I: IntoIterator<Item = Result<ReactionRecord<S::Molecule>, crate::io::Error>>,
        W: RecordSink<ReactionRecord<S::Molecule>>,
    {
        info!("Process {} initialized", self.name);
        let start = Instant::now();
        let mut report = WorkerReport {
            name: self.name.clone(),
            ..Default::default()
        };
        let mut pending = Vec::new();

        for (n, entry) in (1..).zip(records) {
            match entry {
                Ok(reaction) => match self.process_reaction(reaction) {
                    ReactionOutcome::Rejected(_) => report.rejected += 1,
                    ReactionOutcome::NotRecovered => report.not_recovered += 1,
                    ReactionOutcome::Recovered(records) => {
                        report.recovered += 1;
                        pending.extend(records);
                    }
                },
                Err(e) if e.is_record_level() => {
                    warn!("Process {} skipped record {n}: {e}", self.name);
                    report.unreadable += 1;
                }
                Err(e) => return Err(e.into()),
            }
            report.processed = n;
            on_reaction();

            if self.flush.should_flush(n) {
                info!(
                    "Process {} stepped over: {n} by {:.2}s",
                    self.name,
                    start.elapsed().as_secs_f64()
                );
                report.written += sink.write_batch(&pending)?;
                pending.clear();
            }
        }

        report.elapsed = start.elapsed();
        info!(
            "Process {} finished batch processing in time: {:.2}s",
            self.name,
            report.elapsed.as_secs_f64()
        );
        report.written += sink.write_batch(&pending)?;
        Ok(report)
    }
}
