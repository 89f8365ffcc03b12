use crate::chem::{Composition, StructureOps};
use crate::model::reaction::ReactionRecord;

/// Strips spectator molecules and checks that a real transformation remains.
///
/// Returns `None` when the reaction cannot be composed, carries an invalid
/// aromatic ring, loses a whole side, or changes at most one bond.
pub fn remove_reagents<S: StructureOps>(
    ops: &S,
    mut reaction: ReactionRecord<S::Molecule>,
) -> Option<ReactionRecord<S::Molecule>> {
    let composition = ops.compose(&reaction).ok()?;
    ops.remove_unchanged(&mut reaction).ok()?;
    ops.canonicalize(&mut reaction).ok()?;

    reaction.reactants.retain(|m| !ops.atoms(m).is_empty());
    reaction.products.retain(|m| !ops.atoms(m).is_empty());

    let accepted = !reaction.reactants.is_empty()
        && !reaction.products.is_empty()
        && composition.center_bonds > 1;
    accepted.then_some(reaction)
}

/// Replaces every molecule by its connected components.
pub fn split_containers<S: StructureOps>(
    ops: &S,
    reaction: ReactionRecord<S::Molecule>,
) -> ReactionRecord<S::Molecule> {
    let ReactionRecord {
        reactants,
        products,
        meta,
    } = reaction;
    ReactionRecord::new(
        reactants.iter().flat_map(|m| ops.split(m)).collect(),
        products.iter().flat_map(|m| ops.split(m)).collect(),
        meta,
    )
}

/// True unless the reaction has a center and some atom is a radical.
#[inline]
pub fn is_radical_free(composition: &Composition) -> bool {
    !composition.has_center() || !composition.has_radical
}
