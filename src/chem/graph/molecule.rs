use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::types::{BondOrder, Element, Hybridization};
use crate::chem::{AtomId, StructureError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub element: Element,
    #[serde(default)]
    pub charge: i8,
    #[serde(default)]
    pub radical: bool,
    /// Implicit hydrogen count.
    #[serde(default)]
    pub hydrogens: u8,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            charge: 0,
            radical: false,
            hydrogens: 0,
        }
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_radical(mut self, radical: bool) -> Self {
        self.radical = radical;
        self
    }

    pub fn with_hydrogens(mut self, hydrogens: u8) -> Self {
        self.hydrogens = hydrogens;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bond {
    pub i: AtomId,
    pub j: AtomId,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(idx1: AtomId, idx2: AtomId, order: BondOrder) -> Self {
        if idx1 <= idx2 {
            Self { i: idx1, j: idx2, order }
        } else {
            Self { i: idx2, j: idx1, order }
        }
    }

    #[inline]
    pub fn other(&self, atom: AtomId) -> Option<AtomId> {
        if self.i == atom {
            Some(self.j)
        } else if self.j == atom {
            Some(self.i)
        } else {
            None
        }
    }
}

/// Atom-mapped graph: atoms keyed by map number, at most one bond per pair.
///
/// Shared by concrete molecules ([`Molecule`]) and query patterns
/// ([`Query`](super::query::Query)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph<A> {
    atoms: BTreeMap<AtomId, A>,
    #[serde(default)]
    bonds: BTreeSet<Bond>,
}

pub type Molecule = Graph<Atom>;

impl<A> Default for Graph<A> {
    fn default() -> Self {
        Self {
            atoms: BTreeMap::new(),
            bonds: BTreeSet::new(),
        }
    }
}

impl<A> Graph<A> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: AtomId) -> bool {
        self.atoms.contains_key(&id)
    }

    pub fn atom(&self, id: AtomId) -> Option<&A> {
        self.atoms.get(&id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut A> {
        self.atoms.get_mut(&id)
    }

    pub fn atoms(&self) -> impl Iterator<Item = (AtomId, &A)> {
        self.atoms.iter().map(|(&id, atom)| (id, atom))
    }

    pub fn atom_ids(&self) -> BTreeSet<AtomId> {
        self.atoms.keys().copied().collect()
    }

    pub fn max_atom_id(&self) -> Option<AtomId> {
        self.atoms.keys().next_back().copied()
    }

    pub fn min_atom_id(&self) -> Option<AtomId> {
        self.atoms.keys().next().copied()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.iter()
    }

    pub fn add_atom(&mut self, id: AtomId, atom: A) {
        self.atoms.insert(id, atom);
    }

    /// Removes an atom together with every bond touching it.
    pub fn delete_atom(&mut self, id: AtomId) -> Option<A> {
        let removed = self.atoms.remove(&id)?;
        self.bonds.retain(|b| b.i != id && b.j != id);
        Some(removed)
    }

    /// Sets the bond between `i` and `j`, replacing any existing order.
    pub fn add_bond(&mut self, i: AtomId, j: AtomId, order: BondOrder) {
        self.remove_bond(i, j);
        self.bonds.insert(Bond::new(i, j, order));
    }

    pub fn remove_bond(&mut self, i: AtomId, j: AtomId) -> Option<BondOrder> {
        let existing = self.find_bond(i, j)?;
        self.bonds.remove(&existing);
        Some(existing.order)
    }

    pub fn bond(&self, i: AtomId, j: AtomId) -> Option<BondOrder> {
        self.find_bond(i, j).map(|b| b.order)
    }

    fn find_bond(&self, i: AtomId, j: AtomId) -> Option<Bond> {
        let lo = Bond::new(i, j, BondOrder::Single);
        let hi = Bond::new(i, j, BondOrder::Aromatic);
        self.bonds.range(lo..=hi).next().copied()
    }

    pub fn neighbors(&self, id: AtomId) -> impl Iterator<Item = (AtomId, BondOrder)> + '_ {
        self.bonds
            .iter()
            .filter_map(move |b| b.other(id).map(|n| (n, b.order)))
    }

    pub fn degree(&self, id: AtomId) -> usize {
        self.neighbors(id).count()
    }

    /// Whether the `i`–`j` bond closes a cycle.
    pub fn bond_in_ring(&self, i: AtomId, j: AtomId) -> bool {
        if self.find_bond(i, j).is_none() {
            return false;
        }

        let mut seen = BTreeSet::from([i]);
        let mut queue = VecDeque::from([i]);
        while let Some(current) = queue.pop_front() {
            for (next, _) in self.neighbors(current) {
                if current == i && next == j {
                    continue;
                }
                if next == j {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    pub fn in_ring(&self, id: AtomId) -> bool {
        self.neighbors(id).any(|(n, _)| self.bond_in_ring(id, n))
    }
}

impl<A: Clone> Graph<A> {
    /// Induced subgraph over `ids`.
    pub fn subgraph(&self, ids: &BTreeSet<AtomId>) -> Self {
        let atoms = self
            .atoms
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(&id, atom)| (id, atom.clone()))
            .collect();
        let bonds = self
            .bonds
            .iter()
            .filter(|b| ids.contains(&b.i) && ids.contains(&b.j))
            .copied()
            .collect();
        Self { atoms, bonds }
    }

    /// Connected components ordered by their smallest atom number.
    pub fn components(&self) -> Vec<Self> {
        let mut remaining: BTreeSet<AtomId> = self.atom_ids();
        let mut parts = Vec::new();

        while let Some(start) = remaining.pop_first() {
            let mut members = BTreeSet::from([start]);
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for (next, _) in self.neighbors(current) {
                    if members.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            remaining.retain(|id| !members.contains(id));
            parts.push(self.subgraph(&members));
        }

        parts
    }

    /// Disjoint union; fails when two graphs share an atom number or a bond
    /// ends at an atom no graph contains.
    pub fn union<'a>(graphs: impl IntoIterator<Item = &'a Self>) -> Result<Self, StructureError>
    where
        A: 'a,
    {
        let mut merged = Self::new();
        for graph in graphs {
            for (&id, atom) in &graph.atoms {
                if merged.atoms.insert(id, atom.clone()).is_some() {
                    return Err(StructureError::duplicate_atom(id));
                }
            }
            merged.bonds.extend(graph.bonds.iter().copied());
        }
        if let Some(bond) = merged
            .bonds
            .iter()
            .find(|b| !merged.atoms.contains_key(&b.i) || !merged.atoms.contains_key(&b.j))
        {
            return Err(StructureError::dangling_bond(bond.i, bond.j));
        }
        Ok(merged)
    }
}

impl Graph<Atom> {
    pub fn hybridization(&self, id: AtomId) -> Hybridization {
        Hybridization::perceive(self.neighbors(id).map(|(_, order)| order))
    }

    fn doubled_bond_sum(&self, id: AtomId) -> i32 {
        self.neighbors(id)
            .map(|(_, order)| i32::from(order.doubled()))
            .sum()
    }

    /// Implicit hydrogens implied by the default valence of `id`.
    pub fn implicit_hydrogens(&self, id: AtomId) -> u8 {
        let Some(atom) = self.atoms.get(&id) else {
            return 0;
        };
        let valence = i32::from(atom.element.default_valence(atom.charge));
        let free = 2 * valence - self.doubled_bond_sum(id) - 2 * i32::from(atom.radical);
        (free / 2).clamp(0, i32::from(u8::MAX)) as u8
    }

    /// Recomputes implicit hydrogens of the listed atoms.
    pub fn refresh_hydrogens(&mut self, ids: impl IntoIterator<Item = AtomId>) {
        for id in ids {
            let hydrogens = self.implicit_hydrogens(id);
            if let Some(atom) = self.atoms.get_mut(&id) {
                atom.hydrogens = hydrogens;
            }
        }
    }

    pub fn with_implicit_hydrogens(mut self) -> Self {
        let ids: Vec<AtomId> = self.atoms.keys().copied().collect();
        self.refresh_hydrogens(ids);
        self
    }

    /// Aromatic bonds that do not lie on a ring.
    pub fn invalid_aromatic_bonds(&self) -> Vec<AtomId> {
        let mut atoms = BTreeSet::new();
        for bond in self.bonds.iter().filter(|b| b.order == BondOrder::Aromatic) {
            if !self.bond_in_ring(bond.i, bond.j) {
                atoms.insert(bond.i);
                atoms.insert(bond.j);
            }
        }
        atoms.into_iter().collect()
    }
}
