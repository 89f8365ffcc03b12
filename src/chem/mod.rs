//! Chemistry capabilities consumed by the generation and merge pipelines.
//!
//! The pipelines never look inside a molecule. Everything they need from the
//! chemistry layer is expressed by [`StructureOps`]: composing a reaction
//! into its condensed form, canonicalizing, splitting into components,
//! extracting query substructures, and applying rule templates.
//!
//! [`graph::GraphChemistry`] is the bundled backend over atom-mapped
//! molecular graphs.

mod error;
pub mod graph;

use std::collections::BTreeSet;
use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use error::StructureError;

use crate::model::reaction::{ReactionRecord, RuleTemplate};
use crate::model::signature::CanonicalSignature;

/// Atom-map number identifying one atom across reactants and products.
pub type AtomId = u32;

/// Summary of a reaction composed into a single condensed structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub signature: CanonicalSignature,
    /// Atoms whose bonding, charge, or radical state changes.
    pub center_atoms: BTreeSet<AtomId>,
    /// Number of bonds whose order changes (formed and broken included).
    pub center_bonds: usize,
    /// Whether any atom is a radical on either side.
    pub has_radical: bool,
}

impl Composition {
    #[inline]
    pub fn has_center(&self) -> bool {
        !self.center_atoms.is_empty()
    }
}

/// One independent reaction-center stage of a reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterDecomposition<M> {
    /// The reaction with only this stage's changes applied.
    pub reaction: ReactionRecord<M>,
    /// Center atoms plus their immediate environment; `None` when the stage
    /// has no center to extend.
    pub extended_center: Option<BTreeSet<AtomId>>,
}

/// Lazily produced results of applying one rule to one reactant set.
pub type RuleMatches<'a, M> =
    Box<dyn Iterator<Item = Result<ReactionRecord<M>, StructureError>> + 'a>;

/// Capability set of a chemistry backend.
///
/// Implementations must make [`compose`](StructureOps::compose)
/// deterministic: equal transformations give equal signatures no matter how
/// reactants, products, or atom numbers are ordered.
pub trait StructureOps {
    type Molecule: Clone + PartialEq + Debug + Serialize + DeserializeOwned;
    type Query: Clone + PartialEq + Debug + Serialize + DeserializeOwned;

    fn compose(
        &self,
        reaction: &ReactionRecord<Self::Molecule>,
    ) -> Result<Composition, StructureError>;

    /// Brings both sides into canonical order and validates aromaticity.
    fn canonicalize(
        &self,
        reaction: &mut ReactionRecord<Self::Molecule>,
    ) -> Result<(), StructureError>;

    /// Deletes atoms that belong to composed components without any change.
    fn remove_unchanged(
        &self,
        reaction: &mut ReactionRecord<Self::Molecule>,
    ) -> Result<(), StructureError>;

    fn split(&self, molecule: &Self::Molecule) -> Vec<Self::Molecule>;

    fn atoms(&self, molecule: &Self::Molecule) -> BTreeSet<AtomId>;

    fn enumerate_centers(
        &self,
        reaction: &ReactionRecord<Self::Molecule>,
    ) -> Result<Vec<CenterDecomposition<Self::Molecule>>, StructureError>;

    fn substructure(&self, molecule: &Self::Molecule, atoms: &BTreeSet<AtomId>) -> Self::Query;

    /// Turns `atom` into a wildcard attachment point with no neighbor constraint.
    fn erase_neighbors(&self, query: &mut Self::Query, atom: AtomId);

    fn strip_ring_info(&self, query: &mut Self::Query);

    fn strip_hydrogens(&self, query: &mut Self::Query);

    fn strip_hybridization(&self, query: &mut Self::Query, atom: AtomId);

    fn query_atoms(&self, query: &Self::Query) -> BTreeSet<AtomId>;

    /// Matches `rule` against `reactants` and substitutes every match with
    /// the rule's product pattern.
    fn apply_rule<'a>(
        &'a self,
        rule: &'a RuleTemplate<Self::Query>,
        reactants: &'a [Self::Molecule],
    ) -> Result<RuleMatches<'a, Self::Molecule>, StructureError>;
}
