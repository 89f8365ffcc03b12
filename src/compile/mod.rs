//! Per-reaction summaries of a deduplicated dataset.
//!
//! Records are replayed from a merge chunk in stored order and grouped into
//! blocks of consecutive records sharing a `reaction_id`. Each closed block
//! becomes a [`ReactionSummary`]; blocks that never saw a `Reconstructed`
//! record go to a separate sink.

use std::path::Path;

use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::RecordSink;
use crate::merge::{Error, read_blocks};
use crate::model::reaction::ReactionRecord;
use crate::model::summary::ReactionSummary;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub records: usize,
    pub summaries: usize,
    pub unreconstructed: usize,
    pub skipped: usize,
    pub flushes: usize,
}

/// Folds a replayed record stream into per-reaction summaries.
///
/// Closed summaries are held until the number of records examined since the
/// last flush reaches the size of the input block being replayed, then
/// written out together.
#[derive(Debug)]
pub struct CompileAggregator<M> {
    current: Option<ReactionSummary<M>>,
    closed: Vec<ReactionSummary<M>>,
    unreconstructed: Vec<ReactionSummary<M>>,
    examined: usize,
    block_len: usize,
    report: CompileReport,
}

impl<M> Default for CompileAggregator<M> {
    fn default() -> Self {
        Self {
            current: None,
            closed: Vec::new(),
            unreconstructed: Vec::new(),
            examined: 0,
            block_len: 0,
            report: CompileReport::default(),
        }
    }
}

impl<M: Clone> CompileAggregator<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announces the size of the input block the next records come from.
    pub fn begin_block(&mut self, len: usize) {
        self.block_len = len;
    }

    pub fn report(&self) -> &CompileReport {
        &self.report
    }

    pub fn push<A, B>(
        &mut self,
        record: ReactionRecord<M>,
        main: &mut A,
        unreconstructed: &mut B,
    ) -> Result<(), crate::io::Error>
    where
        A: RecordSink<ReactionSummary<M>>,
        B: RecordSink<ReactionSummary<M>>,
    {
        self.examined += 1;
        self.report.records += 1;

        let Some(kind) = record.reaction_type() else {
            warn!(
                "Skipped record {} with reaction ID {}: missing reaction type",
                self.report.records,
                record.reaction_id()
            );
            self.report.skipped += 1;
            return Ok(());
        };

        let opens_block = self
            .current
            .as_ref()
            .is_none_or(|summary| summary.reaction_id != record.reaction_id());
        if opens_block {
            self.close();
            if self.examined >= self.block_len {
                self.flush(main, unreconstructed)?;
            }
            self.current = Some(ReactionSummary::new(record.reaction_id()));
        }

        if let Some(summary) = self.current.as_mut() {
            summary.record(&record, kind);
        }
        Ok(())
    }

    /// Closes the open block and writes everything still held.
    pub fn finish<A, B>(
        mut self,
        main: &mut A,
        unreconstructed: &mut B,
    ) -> Result<CompileReport, crate::io::Error>
    where
        A: RecordSink<ReactionSummary<M>>,
        B: RecordSink<ReactionSummary<M>>,
    {
        self.close();
        self.flush(main, unreconstructed)?;
        Ok(self.report)
    }

    fn close(&mut self) {
        let Some(summary) = self.current.take() else {
            return;
        };
        if summary.is_reconstructed() {
            self.closed.push(summary);
        } else {
            self.unreconstructed.push(summary);
        }
    }

    fn flush<A, B>(&mut self, main: &mut A, unreconstructed: &mut B) -> Result<(), crate::io::Error>
    where
        A: RecordSink<ReactionSummary<M>>,
        B: RecordSink<ReactionSummary<M>>,
    {
        self.report.summaries += main.write_batch(&self.closed)?;
        self.report.unreconstructed += unreconstructed.write_batch(&self.unreconstructed)?;
        self.closed.clear();
        self.unreconstructed.clear();
        self.examined = 0;
        self.report.flushes += 1;
        Ok(())
    }
}

/// Compiles every record of a merge chunk into `main` and `unreconstructed`.
pub fn compile_chunk<M, A, B>(
    chunk: impl AsRef<Path>,
    main: &mut A,
    unreconstructed: &mut B,
    mut on_record: impl FnMut(),
) -> Result<CompileReport, Error>
where
    M: Clone + Serialize + DeserializeOwned,
    A: RecordSink<ReactionSummary<M>>,
    B: RecordSink<ReactionSummary<M>>,
{
    let mut aggregator = CompileAggregator::new();
    for block in read_blocks::<M>(chunk)? {
        let block = block?;
        aggregator.begin_block(block.len());
        for record in block.into_records() {
            aggregator.push(record, main, unreconstructed)?;
            on_record();
        }
    }
    let report = aggregator.finish(main, unreconstructed)?;
    info!(
        "Compiled {} reactions ({} without reconstruction) from {} records",
        report.summaries, report.unreconstructed, report.records
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{ChunkStore, MergeAccumulator};
    use crate::model::reaction::{Metadata, RuleId};
    use crate::model::signature::CanonicalSignature;
    use crate::model::types::ReactionType;

    fn record(id: &str, kind: ReactionType, rule_id: Option<RuleId>) -> ReactionRecord<u32> {
        let mut meta = Metadata::new(id);
        meta.rule_id = rule_id;
        ReactionRecord::new(vec![1], vec![2], meta).tagged(kind)
    }

    fn sinks() -> (Vec<ReactionSummary<u32>>, Vec<ReactionSummary<u32>>) {
        (Vec::new(), Vec::new())
    }

    #[test]
    fn block_counts_strict_and_library_decoys() {
        let (mut main, mut unrec) = sinks();
        let mut aggregator = CompileAggregator::new();
        aggregator.begin_block(4);

        let reconstructed = record("r1", ReactionType::Reconstructed, None);
        for r in [
            reconstructed.clone(),
            record("r1", ReactionType::Decoy, None),
            record("r1", ReactionType::Decoy, Some(7)),
            record("r1", ReactionType::Decoy, None),
        ] {
            aggregator.push(r, &mut main, &mut unrec).unwrap();
        }
        let report = aggregator.finish(&mut main, &mut unrec).unwrap();

        assert_eq!(report.summaries, 1);
        assert!(unrec.is_empty());
        let summary = &main[0];
        assert_eq!(summary.reaction_id, "r1");
        assert_eq!(summary.reconstructed, Some(reconstructed));
        assert_eq!(summary.total_decoys, 4);
        assert_eq!(summary.structures.len(), 4);
        assert_eq!(summary.strict_count, 2);
        assert_eq!(summary.random_count, 1);
        assert_eq!(summary.random_rule_ids, vec![7]);
    }

    #[test]
    fn unreconstructed_blocks_go_to_their_own_sink() {
        let (mut main, mut unrec) = sinks();
        let mut aggregator = CompileAggregator::new();
        aggregator.begin_block(10);

        for r in [
            record("r1", ReactionType::Reconstructed, None),
            record("r2", ReactionType::Decoy, Some(3)),
            record("r3", ReactionType::Decoy, None),
            record("r3", ReactionType::Reconstructed, None),
        ] {
            aggregator.push(r, &mut main, &mut unrec).unwrap();
        }
        let report = aggregator.finish(&mut main, &mut unrec).unwrap();

        let ids: Vec<&str> = main.iter().map(|s| s.reaction_id.as_str()).collect();
        assert_eq!(ids, ["r1", "r3"]);
        assert_eq!(unrec.len(), 1);
        assert_eq!(unrec[0].reaction_id, "r2");
        assert_eq!(unrec[0].random_rule_ids, vec![3]);
        assert_eq!((report.summaries, report.unreconstructed), (2, 1));
    }

    #[test]
    fn summaries_flush_once_a_block_worth_is_examined() {
        let (mut main, mut unrec) = sinks();
        let mut aggregator = CompileAggregator::new();
        aggregator.begin_block(2);

        aggregator
            .push(record("r1", ReactionType::Reconstructed, None), &mut main, &mut unrec)
            .unwrap();
        aggregator
            .push(record("r1", ReactionType::Decoy, None), &mut main, &mut unrec)
            .unwrap();
        assert!(main.is_empty());

        aggregator
            .push(record("r2", ReactionType::Reconstructed, None), &mut main, &mut unrec)
            .unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(aggregator.report().flushes, 1);

        let report = aggregator.finish(&mut main, &mut unrec).unwrap();
        assert_eq!(main.len(), 2);
        assert_eq!(report.flushes, 2);
    }

    #[test]
    fn untyped_records_are_skipped() {
        let (mut main, mut unrec) = sinks();
        let mut aggregator = CompileAggregator::new();
        aggregator.begin_block(3);

        let untyped = ReactionRecord::new(vec![1], vec![2], Metadata::new("r1"));
        aggregator
            .push(record("r1", ReactionType::Reconstructed, None), &mut main, &mut unrec)
            .unwrap();
        aggregator.push(untyped, &mut main, &mut unrec).unwrap();
        let report = aggregator.finish(&mut main, &mut unrec).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.records, 2);
        assert_eq!(main[0].total_decoys, 1);
    }

    #[test]
    fn chunk_is_compiled_block_by_block() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path().join("chunk"));

        let blocks: Vec<MergeAccumulator<u32>> = vec![
            [
                ("a", record("r1", ReactionType::Reconstructed, None)),
                ("b", record("r1", ReactionType::Decoy, Some(1))),
            ],
            [
                ("c", record("r2", ReactionType::Decoy, None)),
                ("d", record("r3", ReactionType::Reconstructed, None)),
            ],
        ]
        .into_iter()
        .map(|block| {
            block
                .into_iter()
                .map(|(key, r)| (CanonicalSignature::from(key), r))
                .collect()
        })
        .collect();
        let mut spill = store.begin(4).unwrap();
        for block in &blocks {
            spill.write_block(block).unwrap();
        }
        let path = spill.commit().unwrap();

        let (mut main, mut unrec) = sinks();
        let mut ticks = 0;
        let report = compile_chunk::<u32, _, _>(&path, &mut main, &mut unrec, || ticks += 1).unwrap();

        assert_eq!(ticks, 4);
        assert_eq!(report.records, 4);
        assert_eq!(main.len(), 2);
        assert_eq!(main[0].random_rule_ids, vec![1]);
        assert_eq!(unrec[0].reaction_id, "r2");
    }
}
