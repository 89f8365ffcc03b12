use serde::{Deserialize, Serialize};

use super::reaction::{ReactionRecord, RuleId};
use super::types::ReactionType;

/// Per-source-reaction statistics compiled from the deduplicated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionSummary<M> {
    pub reaction_id: String,
    /// The regenerated original, if the rule set recovered it.
    pub reconstructed: Option<ReactionRecord<M>>,
    /// Number of records in the block, the reconstructed one included.
    pub total_decoys: usize,
    pub structures: Vec<ReactionRecord<M>>,
    /// Decoys produced by per-reaction strict rules.
    pub strict_count: usize,
    /// Decoys produced by templates of the shared library.
    pub random_count: usize,
    pub random_rule_ids: Vec<RuleId>,
}

impl<M: Clone> ReactionSummary<M> {
    pub fn new(reaction_id: impl Into<String>) -> Self {
        Self {
            reaction_id: reaction_id.into(),
            reconstructed: None,
            total_decoys: 0,
            structures: Vec::new(),
            strict_count: 0,
            random_count: 0,
            random_rule_ids: Vec::new(),
        }
    }

    /// Folds one record of this block into the counters.
    pub fn record(&mut self, record: &ReactionRecord<M>, kind: ReactionType) {
        self.total_decoys += 1;
        self.structures.push(record.clone());

        if kind == ReactionType::Reconstructed {
            self.reconstructed = Some(record.clone());
        } else if let Some(rule_id) = record.rule_id() {
            self.random_count += 1;
            self.random_rule_ids.push(rule_id);
        } else {
            self.strict_count += 1;
        }
    }

    #[inline]
    pub fn is_reconstructed(&self) -> bool {
        self.reconstructed.is_some()
    }
}
