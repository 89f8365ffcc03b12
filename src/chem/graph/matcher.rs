use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::molecule::{Atom, Molecule};
use super::query::Query;
use crate::chem::{AtomId, StructureError};

/// Upper bound on matches enumerated for one pattern/target pair.
pub const MAX_MATCHES: usize = 4096;

/// Pattern atom number to target atom number.
pub type Mapping = BTreeMap<AtomId, AtomId>;

/// Enumerates every injective embedding of `pattern` into `target`.
///
/// Pattern bonds must exist in the target with the same order; extra target
/// bonds between mapped atoms are allowed. Disconnected patterns map their
/// components onto disjoint target atoms.
pub fn find_matches(pattern: &Query, target: &Molecule) -> Vec<Mapping> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let mut search = Search {
        pattern,
        target,
        order: search_order(pattern),
        mapping: Mapping::new(),
        used: BTreeSet::new(),
        found: Vec::new(),
    };
    search.extend(0);
    search.found
}

/// BFS visiting order per pattern component, each atom paired with an
/// already visited neighbor that bounds its candidates.
fn search_order(pattern: &Query) -> Vec<(AtomId, Option<AtomId>)> {
    let mut order = Vec::with_capacity(pattern.atom_count());
    let mut seen = BTreeSet::new();
    for start in pattern.atom_ids() {
        if !seen.insert(start) {
            continue;
        }
        order.push((start, None));
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for (next, _) in pattern.neighbors(current) {
                if seen.insert(next) {
                    order.push((next, Some(current)));
                    queue.push_back(next);
                }
            }
        }
    }
    order
}

struct Search<'a> {
    pattern: &'a Query,
    target: &'a Molecule,
    order: Vec<(AtomId, Option<AtomId>)>,
    mapping: Mapping,
    used: BTreeSet<AtomId>,
    found: Vec<Mapping>,
}

impl Search<'_> {
    fn extend(&mut self, depth: usize) {
        if self.found.len() >= MAX_MATCHES {
            return;
        }
        if depth == self.order.len() {
            self.found.push(self.mapping.clone());
            return;
        }

        let (atom, anchor) = self.order[depth];
        let candidates: Vec<AtomId> = match anchor.and_then(|a| self.mapping.get(&a)) {
            Some(&mapped) => self.target.neighbors(mapped).map(|(n, _)| n).collect(),
            None => self.target.atom_ids().into_iter().collect(),
        };

        for candidate in candidates {
            if self.used.contains(&candidate) || !self.feasible(atom, candidate) {
                continue;
            }
            self.mapping.insert(atom, candidate);
            self.used.insert(candidate);
            self.extend(depth + 1);
            self.used.remove(&candidate);
            self.mapping.remove(&atom);
            if self.found.len() >= MAX_MATCHES {
                return;
            }
        }
    }

    fn feasible(&self, atom: AtomId, candidate: AtomId) -> bool {
        let Some(query) = self.pattern.atom(atom) else {
            return false;
        };
        if !query.matches(self.target, candidate) {
            return false;
        }
        self.pattern.neighbors(atom).all(|(neighbor, order)| {
            match self.mapping.get(&neighbor) {
                Some(&mapped) => self.target.bond(candidate, mapped) == Some(order),
                None => true,
            }
        })
    }
}

/// Rewrites the matched region of `target` from `pattern` into `products`.
///
/// Atoms of the product pattern that have no reactant counterpart receive
/// fresh numbers above the target's largest. Reactant pattern atoms missing
/// from the product pattern are deleted.
pub fn substitute(
    pattern: &Query,
    products: &Query,
    target: &Molecule,
    mapping: &Mapping,
) -> Result<Molecule, StructureError> {
    let mut result = target.clone();

    for bond in pattern.bonds() {
        if let (Some(&i), Some(&j)) = (mapping.get(&bond.i), mapping.get(&bond.j)) {
            result.remove_bond(i, j);
        }
    }

    let mut next_id = target.max_atom_id().unwrap_or(0);
    let mut placed: BTreeMap<AtomId, AtomId> = BTreeMap::new();
    for (id, query) in products.atoms() {
        let target_id = match mapping.get(&id) {
            Some(&mapped) => mapped,
            None => {
                next_id += 1;
                result.add_atom(next_id, Atom::new(query.element));
                next_id
            }
        };
        let atom = result.atom_mut(target_id).ok_or_else(|| {
            StructureError::inconsistent(format!("matched atom {target_id} is missing"))
        })?;
        atom.element = query.element;
        atom.charge = query.charge;
        atom.radical = query.radical;
        placed.insert(id, target_id);
    }

    for bond in products.bonds() {
        let (Some(&i), Some(&j)) = (placed.get(&bond.i), placed.get(&bond.j)) else {
            return Err(StructureError::inconsistent(format!(
                "product bond {}-{} has no placed endpoint",
                bond.i, bond.j
            )));
        };
        result.add_bond(i, j, bond.order);
    }

    let mut touched: BTreeSet<AtomId> = placed.values().copied().collect();
    for (id, _) in pattern.atoms() {
        if products.contains(id) {
            continue;
        }
        if let Some(&mapped) = mapping.get(&id) {
            touched.extend(result.neighbors(mapped).map(|(n, _)| n));
            result.delete_atom(mapped);
            touched.remove(&mapped);
        }
    }

    for id in touched {
        let explicit = placed
            .iter()
            .find(|&(_, &t)| t == id)
            .and_then(|(&q, _)| products.atom(q))
            .and_then(|q| q.hydrogens);
        let hydrogens = explicit.unwrap_or_else(|| result.implicit_hydrogens(id));
        if let Some(atom) = result.atom_mut(id) {
            atom.hydrogens = hydrogens;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::query::QueryAtom;
    use crate::chem::graph::types::{BondOrder, Element};

    fn make_target() -> Molecule {
        let mut mol = Molecule::new();
        mol.add_atom(1, Atom::new(Element::C));
        mol.add_atom(2, Atom::new(Element::C));
        mol.add_atom(3, Atom::new(Element::Br));
        mol.add_atom(4, Atom::new(Element::O).with_charge(-1));
        mol.add_bond(1, 2, BondOrder::Single);
        mol.add_bond(2, 3, BondOrder::Single);
        mol.with_implicit_hydrogens()
    }

    fn make_pattern() -> (Query, Query) {
        let mut reactants = Query::new();
        reactants.add_atom(10, QueryAtom::new(Element::C));
        reactants.add_atom(11, QueryAtom::new(Element::Br));
        reactants.add_atom(12, QueryAtom { charge: -1, ..QueryAtom::new(Element::O) });
        reactants.add_bond(10, 11, BondOrder::Single);

        let mut products = Query::new();
        products.add_atom(10, QueryAtom::new(Element::C));
        products.add_atom(11, QueryAtom { charge: -1, ..QueryAtom::new(Element::Br) });
        products.add_atom(12, QueryAtom::new(Element::O));
        products.add_bond(10, 12, BondOrder::Single);
        (reactants, products)
    }

    #[test]
    fn finds_single_embedding_for_disconnected_pattern() {
        let (pattern, _) = make_pattern();
        let matches = find_matches(&pattern, &make_target());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0], Mapping::from([(10, 2), (11, 3), (12, 4)]));
    }

    #[test]
    fn no_match_when_bond_order_differs() {
        let mut pattern = Query::new();
        pattern.add_atom(1, QueryAtom::new(Element::C));
        pattern.add_atom(2, QueryAtom::new(Element::C));
        pattern.add_bond(1, 2, BondOrder::Double);
        assert!(find_matches(&pattern, &make_target()).is_empty());
    }

    #[test]
    fn symmetric_pattern_yields_every_embedding() {
        let mut pattern = Query::new();
        pattern.add_atom(1, QueryAtom::new(Element::C));
        pattern.add_atom(2, QueryAtom::new(Element::C));
        pattern.add_bond(1, 2, BondOrder::Single);
        assert_eq!(find_matches(&pattern, &make_target()).len(), 2);
    }

    #[test]
    fn substitute_rewires_bonds_charges_and_hydrogens() {
        let (pattern, products) = make_pattern();
        let target = make_target();
        let mapping = Mapping::from([(10, 2), (11, 3), (12, 4)]);

        let result = substitute(&pattern, &products, &target, &mapping).unwrap();
        assert_eq!(result.bond(2, 4), Some(BondOrder::Single));
        assert_eq!(result.bond(2, 3), None);
        assert_eq!(result.bond(1, 2), Some(BondOrder::Single));
        assert_eq!(result.atom(3).unwrap().charge, -1);
        assert_eq!(result.atom(4).unwrap().charge, 0);
        assert_eq!(result.atom(4).unwrap().hydrogens, 1);
        assert_eq!(result.atom(2).unwrap().hydrogens, 2);
        assert_eq!(result.components().len(), 2);
    }

    #[test]
    fn substitute_deletes_atoms_absent_from_products() {
        let (pattern, mut products) = make_pattern();
        products.delete_atom(11);
        let result =
            substitute(&pattern, &products, &make_target(), &Mapping::from([(10, 2), (11, 3), (12, 4)]))
                .unwrap();
        assert!(!result.contains(3));
        assert_eq!(result.atom_count(), 3);
    }

    #[test]
    fn substitute_numbers_new_atoms_above_target() {
        let (pattern, mut products) = make_pattern();
        products.add_atom(20, QueryAtom::new(Element::C));
        products.add_bond(12, 20, BondOrder::Single);
        let result =
            substitute(&pattern, &products, &make_target(), &Mapping::from([(10, 2), (11, 3), (12, 4)]))
                .unwrap();
        assert_eq!(result.atom(5).map(|a| a.element), Some(Element::C));
        assert_eq!(result.bond(4, 5), Some(BondOrder::Single));
        assert_eq!(result.atom(5).unwrap().hydrogens, 3);
    }
}
