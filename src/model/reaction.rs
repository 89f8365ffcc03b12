use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::ReactionType;

/// Identifier of a rule drawn from the shared template library.
pub type RuleId = u64;

/// Metadata attached to every reaction record.
///
/// `reaction_id` names the source reaction a record derives from. The
/// `reaction_type` tag is absent on raw input records and assigned once a
/// record is classified. Library templates carry a `rule_id` that survives
/// into the decoys they produce; decoys from per-reaction strict rules have
/// none.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub reaction_id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub reaction_type: Option<ReactionType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,

    /// Any further key/value pairs carried through from the input data.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn new(reaction_id: impl Into<String>) -> Self {
        Self {
            reaction_id: reaction_id.into(),
            ..Default::default()
        }
    }

    pub fn with_rule_id(mut self, rule_id: RuleId) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    /// Merges `other` into `self`; fields present in `other` win.
    pub fn update(&mut self, other: &Metadata) {
        self.reaction_id.clone_from(&other.reaction_id);
        if other.reaction_type.is_some() {
            self.reaction_type = other.reaction_type;
        }
        if other.rule_id.is_some() {
            self.rule_id = other.rule_id;
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A reaction: ordered reactant and product structures plus metadata.
///
/// Generic over the structure type so the same record carries concrete
/// molecules (`M`) or query patterns (see [`RuleTemplate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord<M> {
    pub reactants: Vec<M>,
    pub products: Vec<M>,
    pub meta: Metadata,
}

impl<M> ReactionRecord<M> {
    pub fn new(reactants: Vec<M>, products: Vec<M>, meta: Metadata) -> Self {
        Self {
            reactants,
            products,
            meta,
        }
    }

    #[inline]
    pub fn reaction_id(&self) -> &str {
        &self.meta.reaction_id
    }

    #[inline]
    pub fn reaction_type(&self) -> Option<ReactionType> {
        self.meta.reaction_type
    }

    #[inline]
    pub fn rule_id(&self) -> Option<RuleId> {
        self.meta.rule_id
    }

    pub fn set_type(&mut self, kind: ReactionType) {
        self.meta.reaction_type = Some(kind);
    }

    pub fn tagged(mut self, kind: ReactionType) -> Self {
        self.set_type(kind);
        self
    }

    /// Iterates over reactants followed by products.
    pub fn molecules(&self) -> impl Iterator<Item = &M> {
        self.reactants.iter().chain(self.products.iter())
    }

    pub fn molecules_mut(&mut self) -> impl Iterator<Item = &mut M> {
        self.reactants.iter_mut().chain(self.products.iter_mut())
    }
}

/// A local transformation pattern applied to reactant sets.
///
/// Structurally a reaction over query patterns `Q` rather than molecules.
pub type RuleTemplate<Q> = ReactionRecord<Q>;
