//! Condensed graph of a reaction: reactant and product sides overlaid on
//! shared atom numbers.
//!
//! Every atom and bond carries its state on both sides. Atoms whose state
//! differs, or that touch a bond whose order differs, form the reaction
//! center. The canonical signature is a SHA-256 digest over
//! Weisfeiler–Lehman refined labels, which makes it independent of atom
//! numbering and of molecule order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use super::molecule::{Atom, Molecule};
use super::types::BondOrder;
use crate::chem::{AtomId, Composition, StructureError};
use crate::model::signature::CanonicalSignature;

#[derive(Debug, Clone, PartialEq)]
pub struct CondensedAtom {
    pub reactant: Option<Atom>,
    pub product: Option<Atom>,
}

impl CondensedAtom {
    fn is_dynamic(&self) -> bool {
        match (&self.reactant, &self.product) {
            (Some(r), Some(p)) => r.charge != p.charge || r.radical != p.radical,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CondensedBond {
    pub reactant: Option<BondOrder>,
    pub product: Option<BondOrder>,
}

impl CondensedBond {
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.reactant != self.product
    }
}

#[derive(Debug, Clone, Default)]
pub struct CondensedGraph {
    atoms: BTreeMap<AtomId, CondensedAtom>,
    bonds: BTreeMap<(AtomId, AtomId), CondensedBond>,
}

impl CondensedGraph {
    pub fn compose(reactants: &[Molecule], products: &[Molecule]) -> Result<Self, StructureError> {
        let left = Molecule::union(reactants)?;
        let right = Molecule::union(products)?;

        let mut atoms: BTreeMap<AtomId, CondensedAtom> = BTreeMap::new();
        for (id, atom) in left.atoms() {
            atoms.insert(
                id,
                CondensedAtom {
                    reactant: Some(atom.clone()),
                    product: None,
                },
            );
        }
        for (id, atom) in right.atoms() {
            atoms
                .entry(id)
                .or_insert(CondensedAtom {
                    reactant: None,
                    product: None,
                })
                .product = Some(atom.clone());
        }

        let mut bonds: BTreeMap<(AtomId, AtomId), CondensedBond> = BTreeMap::new();
        for bond in left.bonds() {
            bonds.insert(
                (bond.i, bond.j),
                CondensedBond {
                    reactant: Some(bond.order),
                    product: None,
                },
            );
        }
        for bond in right.bonds() {
            bonds
                .entry((bond.i, bond.j))
                .or_insert(CondensedBond {
                    reactant: None,
                    product: None,
                })
                .product = Some(bond.order);
        }

        Ok(Self { atoms, bonds })
    }

    pub fn center_atoms(&self) -> BTreeSet<AtomId> {
        let mut center: BTreeSet<AtomId> = self
            .atoms
            .iter()
            .filter(|(_, atom)| atom.is_dynamic())
            .map(|(&id, _)| id)
            .collect();
        for (&(i, j), bond) in &self.bonds {
            if bond.is_dynamic() {
                center.insert(i);
                center.insert(j);
            }
        }
        center
    }

    pub fn center_bonds(&self) -> usize {
        self.bonds.values().filter(|b| b.is_dynamic()).count()
    }

    pub fn has_radical(&self) -> bool {
        self.atoms.values().any(|atom| {
            atom.reactant.as_ref().is_some_and(|a| a.radical)
                || atom.product.as_ref().is_some_and(|a| a.radical)
        })
    }

    pub fn composition(&self) -> Composition {
        Composition {
            signature: self.signature(),
            center_atoms: self.center_atoms(),
            center_bonds: self.center_bonds(),
            has_radical: self.has_radical(),
        }
    }

    fn adjacency(&self, dynamic_only: bool) -> BTreeMap<AtomId, Vec<AtomId>> {
        let mut adjacency: BTreeMap<AtomId, Vec<AtomId>> =
            self.atoms.keys().map(|&id| (id, Vec::new())).collect();
        for (&(i, j), bond) in &self.bonds {
            if dynamic_only && !bond.is_dynamic() {
                continue;
            }
            adjacency.entry(i).or_default().push(j);
            adjacency.entry(j).or_default().push(i);
        }
        adjacency
    }

    fn flood(adjacency: &BTreeMap<AtomId, Vec<AtomId>>, seeds: &BTreeSet<AtomId>) -> Vec<BTreeSet<AtomId>> {
        let mut remaining = seeds.clone();
        let mut groups = Vec::new();
        while let Some(start) = remaining.pop_first() {
            let mut members = BTreeSet::from([start]);
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for &next in adjacency.get(&current).into_iter().flatten() {
                    if members.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            remaining.retain(|id| !members.contains(id));
            groups.push(members);
        }
        groups
    }

    /// Connected components over bonds present on either side.
    pub fn components(&self) -> Vec<BTreeSet<AtomId>> {
        let all: BTreeSet<AtomId> = self.atoms.keys().copied().collect();
        Self::flood(&self.adjacency(false), &all)
    }

    /// Independent reaction centers: center atoms linked by changing bonds.
    pub fn center_stages(&self) -> Vec<BTreeSet<AtomId>> {
        Self::flood(&self.adjacency(true), &self.center_atoms())
    }

    /// `stage` plus every atom bonded to it on either side.
    pub fn extend(&self, stage: &BTreeSet<AtomId>) -> BTreeSet<AtomId> {
        let adjacency = self.adjacency(false);
        let mut extended = stage.clone();
        for id in stage {
            extended.extend(adjacency.get(id).into_iter().flatten().copied());
        }
        extended
    }

    /// Product side obtained by applying only the changes inside `stage`.
    pub fn apply_stage(&self, stage: &BTreeSet<AtomId>) -> Molecule {
        let mut graph = Molecule::new();
        for (&id, atom) in &self.atoms {
            let side = if stage.contains(&id) {
                &atom.product
            } else {
                &atom.reactant
            };
            if let Some(state) = side {
                graph.add_atom(id, state.clone());
            }
        }
        for (&(i, j), bond) in &self.bonds {
            if !graph.contains(i) || !graph.contains(j) {
                continue;
            }
            let order = if stage.contains(&i) && stage.contains(&j) {
                bond.product
            } else {
                bond.reactant
            };
            if let Some(order) = order {
                graph.add_bond(i, j, order);
            }
        }
        graph
    }

    pub fn signature(&self) -> CanonicalSignature {
        let mut labels: BTreeMap<AtomId, [u8; 32]> = self
            .atoms
            .iter()
            .map(|(&id, atom)| {
                let initial = format!(
                    "{}>{}",
                    side_label(atom.reactant.as_ref()),
                    side_label(atom.product.as_ref())
                );
                (id, digest(b"atom", &[initial.as_bytes()]))
            })
            .collect();

        let mut neighbors: BTreeMap<AtomId, Vec<(AtomId, String)>> = BTreeMap::new();
        for (&(i, j), bond) in &self.bonds {
            let label = bond_label(bond);
            neighbors.entry(i).or_default().push((j, label.clone()));
            neighbors.entry(j).or_default().push((i, label));
        }

        let mut classes = distinct(&labels);
        for _ in 0..self.atoms.len() {
            let refined: BTreeMap<AtomId, [u8; 32]> = labels
                .iter()
                .map(|(&id, own)| {
                    let mut around: Vec<([u8; 32], &str)> = neighbors
                        .get(&id)
                        .into_iter()
                        .flatten()
                        .map(|(n, label)| (labels[n], label.as_str()))
                        .collect();
                    around.sort();
                    let mut parts: Vec<&[u8]> = vec![own.as_slice()];
                    for (label, bond) in &around {
                        parts.push(bond.as_bytes());
                        parts.push(label.as_slice());
                    }
                    (id, digest(b"refine", &parts))
                })
                .collect();

            let refined_classes = distinct(&refined);
            labels = refined;
            if refined_classes == classes {
                break;
            }
            classes = refined_classes;
        }

        let mut atom_labels: Vec<[u8; 32]> = labels.values().copied().collect();
        atom_labels.sort();

        let mut bond_labels: Vec<([u8; 32], [u8; 32], String)> = self
            .bonds
            .iter()
            .map(|(&(i, j), bond)| {
                let (a, b) = (labels[&i], labels[&j]);
                (a.min(b), a.max(b), bond_label(bond))
            })
            .collect();
        bond_labels.sort();

        let mut hasher = Sha256::new();
        hasher.update(b"decoy-forge:cgr:v1");
        hasher.update((atom_labels.len() as u64).to_le_bytes());
        for label in &atom_labels {
            hasher.update(label);
        }
        hasher.update((bond_labels.len() as u64).to_le_bytes());
        for (a, b, label) in &bond_labels {
            hasher.update(a);
            hasher.update(b);
            hasher.update(label.as_bytes());
        }

        let mut key = String::with_capacity(64);
        for byte in hasher.finalize() {
            let _ = write!(key, "{byte:02x}");
        }
        CanonicalSignature::new(key)
    }
}

fn side_label(atom: Option<&Atom>) -> String {
    match atom {
        Some(a) => format!(
            "{}{:+}{}H{}",
            a.element,
            a.charge,
            if a.radical { "*" } else { "" },
            a.hydrogens
        ),
        None => "-".to_string(),
    }
}

fn bond_label(bond: &CondensedBond) -> String {
    let side = |order: Option<BondOrder>| order.map_or(0, |o| o.doubled());
    format!("{}>{}", side(bond.reactant), side(bond.product))
}

fn digest(domain: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn distinct(labels: &BTreeMap<AtomId, [u8; 32]>) -> usize {
    labels.values().collect::<BTreeSet<_>>().len()
}
