//! Bounded-memory deduplication of generated reaction records.
//!
//! The [`MergePipeline`] reads the concatenated worker output once. Records
//! are keyed by canonical signature in an in-memory window; every
//! `dump_size` records the window is reconciled against the previous chunk
//! on disk and both are written to a new chunk, which replaces the old one.
//! At most one window and one chunk are live at any time, while duplicates
//! arbitrarily far apart in the stream are still resolved.

mod accumulator;
mod chunk;
mod error;

pub use accumulator::{
    MergeAccumulator, Offer, Reconciliation, ReconstructedFirst, ResolutionPolicy, Winner,
};
pub use chunk::{ChunkBlocks, ChunkSpill, ChunkStore, read_blocks};
pub use error::Error;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::chem::StructureOps;
use crate::io::{Format, RecordWriter};
use crate::model::reaction::ReactionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Records per window before spilling to disk.
    pub dump_size: usize,
    /// Chunk files are named `{chunk_base}_{index}`.
    pub chunk_base: PathBuf,
    /// Skip this many leading records and continue from chunk
    /// `{chunk_base}_{resume_from}` of an interrupted run.
    pub resume_from: Option<usize>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            dump_size: 100_000,
            chunk_base: PathBuf::from("merged"),
            resume_from: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// The chunk holding the deduplicated dataset.
    pub chunk_path: PathBuf,
    /// Stream positions consumed, resumed ones included.
    pub records_seen: usize,
    /// Records in the final chunk.
    pub kept: usize,
    /// Entries displaced by a later `Reconstructed` record.
    pub replaced: usize,
    /// Records dropped in favor of an earlier one.
    pub duplicates: usize,
    /// Records that were unreadable, untyped, or could not be composed.
    pub skipped: usize,
    pub spills: usize,
}

pub struct MergePipeline<'a, S, P = ReconstructedFirst> {
    ops: &'a S,
    options: MergeOptions,
    policy: P,
    store: ChunkStore,
}

impl<'a, S: StructureOps> MergePipeline<'a, S> {
    pub fn new(ops: &'a S, options: MergeOptions) -> Result<Self, Error> {
        Self::with_policy(ops, options, ReconstructedFirst)
    }
}

impl<'a, S: StructureOps, P: ResolutionPolicy> MergePipeline<'a, S, P> {
    pub fn with_policy(ops: &'a S, options: MergeOptions, policy: P) -> Result<Self, Error> {
        if options.dump_size == 0 {
            return Err(Error::ZeroDumpSize);
        }
        let store = ChunkStore::new(&options.chunk_base);
        Ok(Self {
            ops,
            options,
            policy,
            store,
        })
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Consumes `records` and leaves the deduplicated result in one chunk.
    ///
    /// Bad records are logged and skipped; only failing reads of the stream
    /// itself and chunk I/O end the run. `on_record` runs once per stream
    /// position.
    pub fn run<I>(&self, records: I, mut on_record: impl FnMut()) -> Result<MergeReport, Error>
    where
        I: IntoIterator<Item = Result<ReactionRecord<S::Molecule>, crate::io::Error>>,
    {
        let resume = self.options.resume_from.unwrap_or(0);
        if resume > 0 {
            info!("Resuming merge after record {resume}");
        }

        let mut report = MergeReport::default();
        let mut window = MergeAccumulator::new();
        let mut checkpoint = resume;
        let mut seen = 0;

        for (n, entry) in (1..).zip(records) {
            seen = n;
            on_record();
            if n <= resume {
                continue;
            }
            match entry {
                Ok(record) => self.absorb(n, record, &mut window, &mut report),
                Err(e) if e.is_record_level() => {
                    warn!("Skipped record {n}: {e}");
                    report.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
            if n % self.options.dump_size == 0 {
                self.spill(checkpoint, n, &mut window, &mut report)?;
                checkpoint = n;
            }
        }

        if !window.is_empty() || !self.store.exists(checkpoint) {
            self.spill(checkpoint, seen, &mut window, &mut report)?;
            checkpoint = seen;
        }

        report.records_seen = seen;
        report.chunk_path = self.store.path(checkpoint);
        info!(
            "Merge finished: {} records kept in '{}' ({} replaced, {} duplicates, {} skipped)",
            report.kept,
            report.chunk_path.display(),
            report.replaced,
            report.duplicates,
            report.skipped
        );
        Ok(report)
    }

    fn absorb(
        &self,
        n: usize,
        record: ReactionRecord<S::Molecule>,
        window: &mut MergeAccumulator<S::Molecule>,
        report: &mut MergeReport,
    ) {
        let id = record.reaction_id().to_owned();
        if record.reaction_type().is_none() {
            warn!("Skipped record {n} with reaction ID {id}: missing reaction type");
            report.skipped += 1;
            return;
        }
        let signature = match self.ops.compose(&record) {
            Ok(composition) => composition.signature,
            Err(e) => {
                warn!("Skipped record {n} with reaction ID {id}: {e}");
                report.skipped += 1;
                return;
            }
        };

        match window.offer(signature.clone(), record, &self.policy) {
            Offer::Inserted => {}
            Offer::Replaced(_) => {
                info!("Replaced by reconstructed: {id}");
                report.replaced += 1;
            }
            Offer::Dropped(_) => {
                let kept = window.get(&signature).map_or("", |r| r.reaction_id());
                debug!("Found duplicate decoy: {id}, kept ID: {kept}");
                report.duplicates += 1;
            }
        }
    }

    /// Writes chunk `index` from the reconciled chunk `previous` followed by
    /// `window`, then retires `previous` and empties the window.
    fn spill(
        &self,
        previous: usize,
        index: usize,
        window: &mut MergeAccumulator<S::Molecule>,
        report: &mut MergeReport,
    ) -> Result<(), Error> {
        let mut spill = self.store.begin(index)?;

        match self.store.read::<S::Molecule>(previous)? {
            Some(blocks) => {
                for block in blocks {
                    let mut block = block?;
                    let outcome = window.reconcile(&mut block, &self.policy);
                    report.replaced += outcome.replaced;
                    report.duplicates += outcome.dropped;
                    spill.write_block(&block)?;
                }
            }
            None => debug!(
                "No chunk at '{}', starting fresh",
                self.store.path(previous).display()
            ),
        }
        spill.write_block(window)?;

        let kept = spill.records();
        let path = spill.commit()?;
        if previous != index {
            self.store.remove(previous)?;
        }
        window.clear();

        report.kept = kept;
        report.spills += 1;
        info!("Spilled {kept} records to '{}'", path.display());
        Ok(())
    }
}

/// Flattens a merge chunk into a plain reaction records file.
pub fn export_chunk<M>(chunk: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<usize, Error>
where
    M: serde::Serialize + serde::de::DeserializeOwned,
{
    let writer = RecordWriter::create(dest, Format::Reactions)?;
    let mut written = 0;
    for block in read_blocks::<M>(chunk)? {
        let block = block?;
        let records: Vec<&ReactionRecord<M>> = block.records().collect();
        written += writer.append_all(&records)?;
    }
    Ok(written)
}
