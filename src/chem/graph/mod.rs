//! Reference chemistry backend over atom-mapped molecular graphs.
//!
//! Molecules are graphs of atoms keyed by their map number. Reactions are
//! compared through their condensed graph, and rule templates are applied
//! by exhaustive substructure matching followed by a one-shot substitution.

mod condensed;
mod matcher;
mod molecule;
mod query;
mod types;

use std::collections::BTreeSet;

pub use condensed::CondensedGraph;
pub use matcher::{MAX_MATCHES, Mapping, find_matches};
pub use molecule::{Atom, Bond, Graph, Molecule};
pub use query::{Query, QueryAtom};
pub use types::{BondOrder, Element, Hybridization, ParseBondOrderError, ParseElementError};

use super::{AtomId, CenterDecomposition, Composition, RuleMatches, StructureError, StructureOps};
use crate::model::reaction::{ReactionRecord, RuleTemplate};

/// Stateless [`StructureOps`] implementation over [`Molecule`] and [`Query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphChemistry;

impl GraphChemistry {
    pub fn new() -> Self {
        Self
    }

    fn condensed(reaction: &ReactionRecord<Molecule>) -> Result<CondensedGraph, StructureError> {
        CondensedGraph::compose(&reaction.reactants, &reaction.products)
    }
}

impl StructureOps for GraphChemistry {
    type Molecule = Molecule;
    type Query = Query;

    fn compose(&self, reaction: &ReactionRecord<Molecule>) -> Result<Composition, StructureError> {
        Ok(Self::condensed(reaction)?.composition())
    }

    fn canonicalize(&self, reaction: &mut ReactionRecord<Molecule>) -> Result<(), StructureError> {
        for molecule in reaction.molecules() {
            let invalid = molecule.invalid_aromatic_bonds();
            if !invalid.is_empty() {
                return Err(StructureError::InvalidAromaticRing(invalid));
            }
        }
        reaction.reactants.sort_by_key(|m| m.min_atom_id());
        reaction.products.sort_by_key(|m| m.min_atom_id());
        Ok(())
    }

    fn remove_unchanged(&self, reaction: &mut ReactionRecord<Molecule>) -> Result<(), StructureError> {
        let cgr = Self::condensed(reaction)?;
        let center = cgr.center_atoms();
        let unchanged: Vec<AtomId> = cgr
            .components()
            .into_iter()
            .filter(|component| component.is_disjoint(&center))
            .flatten()
            .collect();

        for molecule in reaction.molecules_mut() {
            for &id in &unchanged {
                molecule.delete_atom(id);
            }
        }
        Ok(())
    }

    fn split(&self, molecule: &Molecule) -> Vec<Molecule> {
        molecule.components()
    }

    fn atoms(&self, molecule: &Molecule) -> BTreeSet<AtomId> {
        molecule.atom_ids()
    }

    fn enumerate_centers(
        &self,
        reaction: &ReactionRecord<Molecule>,
    ) -> Result<Vec<CenterDecomposition<Molecule>>, StructureError> {
        let cgr = Self::condensed(reaction)?;
        let stages = cgr.center_stages();

        match stages.as_slice() {
            [] => Ok(vec![CenterDecomposition {
                reaction: reaction.clone(),
                extended_center: None,
            }]),
            [single] => Ok(vec![CenterDecomposition {
                reaction: reaction.clone(),
                extended_center: Some(cgr.extend(single)),
            }]),
            _ => Ok(stages
                .iter()
                .map(|stage| CenterDecomposition {
                    reaction: ReactionRecord::new(
                        reaction.reactants.clone(),
                        cgr.apply_stage(stage).components(),
                        reaction.meta.clone(),
                    ),
                    extended_center: Some(cgr.extend(stage)),
                })
                .collect()),
        }
    }

    fn substructure(&self, molecule: &Molecule, atoms: &BTreeSet<AtomId>) -> Query {
        Query::from_substructure(molecule, atoms)
    }

    fn erase_neighbors(&self, query: &mut Query, atom: AtomId) {
        if let Some(q) = query.atom_mut(atom) {
            q.neighbors = None;
        }
    }

    fn strip_ring_info(&self, query: &mut Query) {
        for id in query.atom_ids() {
            if let Some(q) = query.atom_mut(id) {
                q.in_ring = None;
            }
        }
    }

    fn strip_hydrogens(&self, query: &mut Query) {
        for id in query.atom_ids() {
            if let Some(q) = query.atom_mut(id) {
                q.hydrogens = None;
            }
        }
    }

    fn strip_hybridization(&self, query: &mut Query, atom: AtomId) {
        if let Some(q) = query.atom_mut(atom) {
            q.hybridization = None;
        }
    }

    fn query_atoms(&self, query: &Query) -> BTreeSet<AtomId> {
        query.atom_ids()
    }

    fn apply_rule<'a>(
        &'a self,
        rule: &'a RuleTemplate<Query>,
        reactants: &'a [Molecule],
    ) -> Result<RuleMatches<'a, Molecule>, StructureError> {
        let pattern = Query::union(&rule.reactants)?;
        let products = Query::union(&rule.products)?;
        let target = Molecule::union(reactants)?;
        let matches = find_matches(&pattern, &target);

        Ok(Box::new(matches.into_iter().map(move |mapping| {
            let rewritten = matcher::substitute(&pattern, &products, &target, &mapping)?;
            Ok(ReactionRecord::new(
                reactants.to_vec(),
                rewritten.components(),
                rule.meta.clone(),
            ))
        })))
    }
}
