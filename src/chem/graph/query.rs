use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::molecule::{Graph, Molecule};
use super::types::{Element, Hybridization};
use crate::chem::AtomId;

/// Pattern atom of a rule template.
///
/// Element, charge, and radical state always constrain a match. The optional
/// fields constrain only when set; `None` acts as a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryAtom {
    pub element: Element,
    #[serde(default)]
    pub charge: i8,
    #[serde(default)]
    pub radical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybridization: Option<Hybridization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_ring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydrogens: Option<u8>,
}

impl QueryAtom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            charge: 0,
            radical: false,
            neighbors: None,
            hybridization: None,
            in_ring: None,
            hydrogens: None,
        }
    }

    /// Snapshot of atom `id` with every constraint filled in from `molecule`.
    pub fn from_molecule(molecule: &Molecule, id: AtomId) -> Option<Self> {
        let atom = molecule.atom(id)?;
        Some(Self {
            element: atom.element,
            charge: atom.charge,
            radical: atom.radical,
            neighbors: Some(molecule.degree(id).min(usize::from(u8::MAX)) as u8),
            hybridization: Some(molecule.hybridization(id)),
            in_ring: Some(molecule.in_ring(id)),
            hydrogens: Some(atom.hydrogens),
        })
    }

    pub fn matches(&self, molecule: &Molecule, id: AtomId) -> bool {
        let Some(atom) = molecule.atom(id) else {
            return false;
        };
        if atom.element != self.element || atom.charge != self.charge || atom.radical != self.radical
        {
            return false;
        }

        self.neighbors
            .is_none_or(|n| molecule.degree(id) == usize::from(n))
            && self
                .hybridization
                .is_none_or(|h| molecule.hybridization(id) == h)
            && self.in_ring.is_none_or(|r| molecule.in_ring(id) == r)
            && self.hydrogens.is_none_or(|h| atom.hydrogens == h)
    }
}

pub type Query = Graph<QueryAtom>;

impl Graph<QueryAtom> {
    /// Query over the atoms of `molecule` that fall into `ids`.
    pub fn from_substructure(molecule: &Molecule, ids: &BTreeSet<AtomId>) -> Self {
        let mut query = Query::new();
        for &id in ids {
            if let Some(atom) = QueryAtom::from_molecule(molecule, id) {
                query.add_atom(id, atom);
            }
        }
        for bond in molecule.bonds() {
            if query.contains(bond.i) && query.contains(bond.j) {
                query.add_bond(bond.i, bond.j, bond.order);
            }
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::molecule::Atom;
    use crate::chem::graph::types::BondOrder;

    fn make_bromoethane() -> Molecule {
        let mut mol = Molecule::new();
        mol.add_atom(1, Atom::new(Element::C));
        mol.add_atom(2, Atom::new(Element::C));
        mol.add_atom(3, Atom::new(Element::Br));
        mol.add_bond(1, 2, BondOrder::Single);
        mol.add_bond(2, 3, BondOrder::Single);
        mol.with_implicit_hydrogens()
    }

    #[test]
    fn substructure_captures_full_environment() {
        let mol = make_bromoethane();
        let query = Query::from_substructure(&mol, &BTreeSet::from([2, 3]));

        assert_eq!(query.atom_count(), 2);
        assert_eq!(query.bond(2, 3), Some(BondOrder::Single));

        let carbon = query.atom(2).unwrap();
        assert_eq!(carbon.neighbors, Some(2));
        assert_eq!(carbon.hydrogens, Some(2));
        assert_eq!(carbon.hybridization, Some(Hybridization::Sp3));
        assert_eq!(carbon.in_ring, Some(false));
    }

    #[test]
    fn wildcard_fields_do_not_constrain() {
        let mol = make_bromoethane();
        let strict = QueryAtom::from_molecule(&mol, 2).unwrap();
        assert!(strict.matches(&mol, 2));
        assert!(!strict.matches(&mol, 1));

        let loose = QueryAtom {
            neighbors: None,
            hydrogens: None,
            ..strict
        };
        assert!(loose.matches(&mol, 1));
        assert!(!loose.matches(&mol, 3));
    }
}
