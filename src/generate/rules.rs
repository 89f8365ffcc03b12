//! Strict rule extraction from a single source reaction.

use std::collections::BTreeSet;

use log::debug;

use crate::chem::{AtomId, StructureError, StructureOps};
use crate::model::reaction::{ReactionRecord, RuleTemplate};

/// Reaction-center stages examined per reaction.
pub const MAX_CENTER_STAGES: usize = 5;

/// Reactant-side patterns a usable rule must have.
pub const RULE_REACTANTS: usize = 2;

/// Derives up to [`MAX_CENTER_STAGES`] templates from the reaction's
/// independent reaction centers.
///
/// Each template covers the extended center of one stage. Atoms of the
/// extended center outside the bare center lose their neighbor constraint;
/// ring and hydrogen constraints are dropped everywhere, and hybridization
/// is dropped for the bare center atoms.
pub fn extract_rules<S: StructureOps>(
    ops: &S,
    reaction: &ReactionRecord<S::Molecule>,
) -> Result<Vec<RuleTemplate<S::Query>>, StructureError> {
    let mut rules = Vec::new();

    let decompositions = ops.enumerate_centers(reaction)?;
    for (stage, decomposition) in decompositions.into_iter().take(MAX_CENTER_STAGES).enumerate() {
        let Some(extended) = decomposition.extended_center else {
            debug!(
                "Reaction {}: stage {stage} has no extended center",
                reaction.reaction_id()
            );
            continue;
        };
        let partial = decomposition.reaction;

        let bare = match ops.compose(&partial) {
            Ok(composition) => composition.center_atoms,
            Err(e) => {
                debug!("Reaction {}: stage {stage} skipped: {e}", reaction.reaction_id());
                continue;
            }
        };

        let reactants = center_patterns(ops, &partial.reactants, &extended, &bare);
        if reactants.len() != RULE_REACTANTS {
            continue;
        }
        let products = center_patterns(ops, &partial.products, &extended, &bare);

        let mut rule = ReactionRecord::new(reactants, products, reaction.meta.clone());
        for query in rule.molecules_mut() {
            ops.strip_ring_info(query);
            ops.strip_hydrogens(query);
            for &atom in &bare {
                ops.strip_hybridization(query, atom);
            }
        }
        rules.push(rule);
    }

    Ok(rules)
}

fn center_patterns<S: StructureOps>(
    ops: &S,
    molecules: &[S::Molecule],
    extended: &BTreeSet<AtomId>,
    bare: &BTreeSet<AtomId>,
) -> Vec<S::Query> {
    molecules
        .iter()
        .filter_map(|molecule| {
            let group: BTreeSet<AtomId> =
                extended.intersection(&ops.atoms(molecule)).copied().collect();
            if group.is_empty() {
                return None;
            }
            let mut query = ops.substructure(molecule, &group);
            for &atom in group.difference(bare) {
                ops.erase_neighbors(&mut query, atom);
            }
            Some(query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::fixtures::*;
    use crate::chem::graph::{Atom, BondOrder, Element, GraphChemistry, Hybridization, Molecule};
    use crate::model::reaction::Metadata;

    #[test]
    fn substitution_yields_one_two_reactant_rule() {
        let chem = GraphChemistry::new();
        let reaction = substitution("r1");
        let rules = extract_rules(&chem, &reaction).unwrap();
        assert_eq!(rules.len(), 1);

        let rule = &rules[0];
        assert_eq!(rule.reactants.len(), 2);
        assert_eq!(rule.products.len(), 2);
        assert_eq!(rule.meta, reaction.meta);
        assert_eq!(rule.rule_id(), None);

        let halide = &rule.reactants[0];
        assert_eq!(chem.query_atoms(halide), BTreeSet::from([1, 2, 3]));

        let wildcard = halide.atom(1).unwrap();
        assert_eq!(wildcard.neighbors, None);
        assert_eq!(wildcard.hybridization, Some(Hybridization::Sp3));
        assert_eq!(wildcard.hydrogens, None);
        assert_eq!(wildcard.in_ring, None);

        let center = halide.atom(2).unwrap();
        assert_eq!(center.neighbors, Some(2));
        assert_eq!(center.hybridization, None);
    }

    #[test]
    fn strict_rule_reproduces_its_source() {
        let chem = GraphChemistry::new();
        let reaction = substitution("r1");
        let rule = extract_rules(&chem, &reaction).unwrap().remove(0);

        let generated: Vec<_> = chem
            .apply_rule(&rule, &reaction.reactants)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(
            chem.compose(&generated[0]).unwrap().signature,
            chem.compose(&reaction).unwrap().signature
        );
    }

    #[test]
    fn strict_rule_generalizes_to_homologues() {
        let chem = GraphChemistry::new();
        let rule = extract_rules(&chem, &substitution("r1")).unwrap().remove(0);
        let reactants = vec![bromopropane(1, 2, 3, 4), hydroxide(5)];

        let generated: Vec<_> = chem
            .apply_rule(&rule, &reactants)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].products.len(), 2);
    }

    #[test]
    fn intramolecular_change_yields_no_rule() {
        let chem = GraphChemistry::new();
        let mut shifted = Molecule::new();
        shifted.add_atom(1, Atom::new(Element::C));
        shifted.add_atom(2, Atom::new(Element::C));
        shifted.add_atom(3, Atom::new(Element::Br));
        shifted.add_bond(1, 2, BondOrder::Single);
        shifted.add_bond(1, 3, BondOrder::Single);

        let reaction = ReactionRecord::new(
            vec![bromoethane(1, 2, 3)],
            vec![shifted.with_implicit_hydrogens()],
            Metadata::new("shift"),
        );
        assert!(extract_rules(&chem, &reaction).unwrap().is_empty());
    }

    #[test]
    fn stages_are_capped() {
        let chem = GraphChemistry::new();
        let mut reactants = Vec::new();
        let mut products = Vec::new();
        for k in 0..6 {
            let base = 4 * k;
            reactants.push(bromoethane(base + 1, base + 2, base + 3));
            reactants.push(hydroxide(base + 4));
            products.push(ethanol(base + 1, base + 2, base + 4));
            products.push(bromide(base + 3));
        }
        let reaction = ReactionRecord::new(reactants, products, Metadata::new("many"));

        assert_eq!(chem.enumerate_centers(&reaction).unwrap().len(), 6);
        assert_eq!(extract_rules(&chem, &reaction).unwrap().len(), MAX_CENTER_STAGES);
    }

    #[test]
    fn reaction_without_center_yields_no_rule() {
        let chem = GraphChemistry::new();
        let reaction = ReactionRecord::new(vec![water(1)], vec![water(1)], Metadata::new("idle"));
        assert!(extract_rules(&chem, &reaction).unwrap().is_empty());
    }
}
