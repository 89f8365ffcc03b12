//! Decoy reaction generation from transformation rules, with bounded-memory
//! deduplication of the generated dataset.
//!
//! Real reactions are turned into "strict" rule templates around their
//! reaction centers. Applying those rules and a shared template library back
//! to each reaction's reactants yields candidate reactions: the ones that
//! regenerate the original are `Reconstructed`, every other one is a `Decoy`.
//! The multi-million-record output of many workers is then deduplicated by
//! canonical signature on disk and compiled into per-reaction summaries.
//!
//! # Features
//!
//! - **Rule extraction** — Up to five strict templates per reaction, one per
//!   independent reaction-center stage
//! - **Capped rule application** — Per-rule and global caps on generated
//!   candidates, with duplicate suppression
//! - **Recoverability gate** — Only reactions the rules can regenerate
//!   contribute decoys
//! - **Sharded generation** — Independent workers over disjoint input slices,
//!   in a thread pool or as separate processes
//! - **External merge** — Signature-keyed deduplication with crash-atomic
//!   chunk spills and a `Reconstructed`-first conflict policy
//! - **Compilation** — Per-reaction counts of strict and library decoys
//!
//! # Quick Start
//!
//! ```
//! use decoy_forge::chem::StructureOps;
//! use decoy_forge::chem::graph::{Atom, BondOrder, Element, GraphChemistry, Molecule};
//! use decoy_forge::generate::extract_rules;
//! use decoy_forge::{Metadata, ReactionRecord};
//!
//! // CH3CH2Br + OH- -> CH3CH2OH + Br-, atoms mapped 1..=4
//! let mut bromoethane = Molecule::new();
//! bromoethane.add_atom(1, Atom::new(Element::C));
//! bromoethane.add_atom(2, Atom::new(Element::C));
//! bromoethane.add_atom(3, Atom::new(Element::Br));
//! bromoethane.add_bond(1, 2, BondOrder::Single);
//! bromoethane.add_bond(2, 3, BondOrder::Single);
//!
//! let mut hydroxide = Molecule::new();
//! hydroxide.add_atom(4, Atom::new(Element::O).with_charge(-1));
//!
//! let mut ethanol = Molecule::new();
//! ethanol.add_atom(1, Atom::new(Element::C));
//! ethanol.add_atom(2, Atom::new(Element::C));
//! ethanol.add_atom(4, Atom::new(Element::O));
//! ethanol.add_bond(1, 2, BondOrder::Single);
//! ethanol.add_bond(2, 4, BondOrder::Single);
//!
//! let mut bromide = Molecule::new();
//! bromide.add_atom(3, Atom::new(Element::Br).with_charge(-1));
//!
//! let reactants = vec![
//!     bromoethane.with_implicit_hydrogens(),
//!     hydroxide.with_implicit_hydrogens(),
//! ];
//! let products = vec![ethanol.with_implicit_hydrogens(), bromide];
//! let reaction = ReactionRecord::new(reactants.clone(), products.clone(), Metadata::new("rxn-1"));
//!
//! let chem = GraphChemistry::new();
//!
//! // Signatures ignore molecule order
//! let swapped = ReactionRecord::new(
//!     reactants.into_iter().rev().collect(),
//!     products.into_iter().rev().collect(),
//!     Metadata::new("rxn-1"),
//! );
//! assert_eq!(
//!     chem.compose(&reaction)?.signature,
//!     chem.compose(&swapped)?.signature,
//! );
//!
//! // One reaction center, one strict rule with two reactant patterns
//! let rules = extract_rules(&chem, &reaction)?;
//! assert_eq!(rules.len(), 1);
//! assert_eq!(rules[0].reactants.len(), 2);
//! # Ok::<(), decoy_forge::chem::StructureError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`model`] — Reaction records, metadata, signatures, and summaries
//! - [`chem`] — The [`StructureOps`](chem::StructureOps) capability set and
//!   its graph backend
//! - [`io`] — JSON-lines datasets, writers, and the rule library loader
//! - [`generate`] — Rule extraction, application, classification, and the
//!   sharded [`BatchWorker`](generate::BatchWorker)
//! - [`merge`] — The disk-spilled [`MergePipeline`](merge::MergePipeline)
//! - [`compile`] — The per-reaction [`CompileAggregator`](compile::CompileAggregator)

pub mod chem;
pub mod compile;
pub mod generate;
pub mod io;
pub mod merge;
pub mod model;

pub use model::reaction::{Metadata, ReactionRecord, RuleId, RuleTemplate};
pub use model::signature::CanonicalSignature;
pub use model::summary::ReactionSummary;
pub use model::types::{ParseReactionTypeError, ReactionType};
