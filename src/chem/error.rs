use thiserror::Error;

use super::AtomId;

/// Failures signalled by a [`StructureOps`](super::StructureOps) backend.
///
/// None of these abort a run: callers treat them as "drop this candidate"
/// or "skip this rule task".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// A molecule claims aromaticity for bonds that do not close a ring.
    #[error("invalid aromatic ring involving atoms {0:?}")]
    InvalidAromaticRing(Vec<AtomId>),

    /// Atom mapping is inconsistent across the molecules of one side.
    #[error("atom mapping error: {0}")]
    Mapping(String),

    /// A rule's product pattern cannot be placed onto a match.
    #[error("structural inconsistency: {0}")]
    Inconsistent(String),
}

impl StructureError {
    pub fn duplicate_atom(atom: AtomId) -> Self {
        Self::Mapping(format!("atom {atom} appears in more than one molecule on the same side"))
    }

    pub fn dangling_bond(i: AtomId, j: AtomId) -> Self {
        Self::Mapping(format!("bond {i}-{j} ends at an atom that is not present"))
    }

    pub fn inconsistent(details: impl Into<String>) -> Self {
        Self::Inconsistent(details.into())
    }
}
