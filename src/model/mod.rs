//! Core records that flow through decoy generation, merging, and compilation.
//!
//! - [`types`] – The closed [`ReactionType`](types::ReactionType) tag.
//! - [`reaction`] – Reaction records, metadata, and rule templates.
//! - [`signature`] – Canonical signatures used as the sole deduplication key.
//! - [`summary`] – Per-reaction statistics produced by compilation.
//!
//! Records are generic over their structure type; the concrete molecule and
//! query representations come from a [`StructureOps`](crate::chem::StructureOps)
//! backend.

pub mod reaction;
pub mod signature;
pub mod summary;
pub mod types;
