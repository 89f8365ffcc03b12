use std::collections::HashMap;

use super::apply::RuleApplicationEngine;
use super::config::GenerationLimits;
use super::prepare::{remove_reagents, split_containers};
use crate::chem::StructureOps;
use crate::model::reaction::{ReactionRecord, RuleTemplate};
use crate::model::signature::CanonicalSignature;
use crate::model::types::ReactionType;

#[derive(Debug, Clone, PartialEq)]
pub struct DocEntry<M> {
    pub signature: CanonicalSignature,
    pub record: ReactionRecord<M>,
    pub kind: ReactionType,
}

/// Signature-keyed record of everything seen while generating decoys for one
/// source reaction.
///
/// Seeded with the source itself tagged `Initial`. When a candidate
/// regenerates the source, its `Reconstructed` entry takes the seed's slot.
/// Entries keep their insertion order.
#[derive(Debug, Clone)]
pub struct GenerationDoc<M> {
    initial: ReactionRecord<M>,
    initial_signature: CanonicalSignature,
    entries: Vec<DocEntry<M>>,
    index: HashMap<CanonicalSignature, usize>,
}

impl<M: Clone> GenerationDoc<M> {
    pub fn new(signature: CanonicalSignature, initial: ReactionRecord<M>) -> Self {
        let initial = initial.tagged(ReactionType::Initial);
        let mut doc = Self {
            initial: initial.clone(),
            initial_signature: signature.clone(),
            entries: Vec::new(),
            index: HashMap::new(),
        };
        doc.insert(signature, initial, ReactionType::Initial);
        doc
    }

    /// Type a candidate with `signature` would receive, or `None` when it
    /// must be discarded.
    pub fn classify(&self, signature: &CanonicalSignature) -> Option<ReactionType> {
        match self.get(signature) {
            None => Some(ReactionType::Decoy),
            Some(entry) if entry.kind == ReactionType::Initial => Some(ReactionType::Reconstructed),
            Some(_) => None,
        }
    }

    /// Stores `record` under `signature`, replacing any entry already there.
    pub fn insert(&mut self, signature: CanonicalSignature, record: ReactionRecord<M>, kind: ReactionType) {
        let entry = DocEntry {
            signature: signature.clone(),
            record: record.tagged(kind),
            kind,
        };
        match self.index.get(&signature) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(signature, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, signature: &CanonicalSignature) -> Option<&DocEntry<M>> {
        self.index.get(signature).map(|&slot| &self.entries[slot])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DocEntry<M>] {
        &self.entries
    }

    /// The source reaction as seeded.
    pub fn initial(&self) -> &ReactionRecord<M> {
        &self.initial
    }

    pub fn initial_signature(&self) -> &CanonicalSignature {
        &self.initial_signature
    }

    /// Whether some candidate regenerated the source reaction.
    pub fn is_recovered(&self) -> bool {
        !self.entries.iter().any(|e| e.kind == ReactionType::Initial)
    }

    pub fn has_reconstructed(&self) -> bool {
        self.entries.iter().any(|e| e.kind == ReactionType::Reconstructed)
    }

    /// Every generated record in insertion order, the seed excluded.
    pub fn into_generated(self) -> Vec<ReactionRecord<M>> {
        self.entries
            .into_iter()
            .filter(|e| e.kind != ReactionType::Initial)
            .map(|e| e.record)
            .collect()
    }
}

/// Turns raw rule outputs into classified doc entries.
pub struct DecoyClassifier<'a, S> {
    ops: &'a S,
    limits: GenerationLimits,
}

impl<'a, S: StructureOps> DecoyClassifier<'a, S> {
    pub fn new(ops: &'a S, limits: GenerationLimits) -> Self {
        Self { ops, limits }
    }

    /// Runs one generation pass of `rules` against the source's reactants.
    ///
    /// Returns how many candidates were accepted into `doc`; never more than
    /// `max_decoys`.
    pub fn generate(
        &self,
        source: &ReactionRecord<S::Molecule>,
        rules: &[RuleTemplate<S::Query>],
        doc: &mut GenerationDoc<S::Molecule>,
    ) -> usize {
        let engine = RuleApplicationEngine::new(self.ops, &self.limits);
        let mut accepted = 0;

        for candidate in engine.apply(&source.reactants, rules) {
            if accepted == self.limits.max_decoys {
                break;
            }
            let Some((record, signature)) = self.prepare(source, candidate) else {
                continue;
            };
            let Some(kind) = doc.classify(&signature) else {
                continue;
            };
            doc.insert(signature, record, kind);
            accepted += 1;
        }

        accepted
    }

    /// Rebuilds a candidate on the source's reactants and normalizes it.
    fn prepare(
        &self,
        source: &ReactionRecord<S::Molecule>,
        candidate: ReactionRecord<S::Molecule>,
    ) -> Option<(ReactionRecord<S::Molecule>, CanonicalSignature)> {
        let mut meta = candidate.meta;
        meta.update(&source.meta);
        let mut record = ReactionRecord::new(source.reactants.clone(), candidate.products, meta);

        self.ops.canonicalize(&mut record).ok()?;
        let record = split_containers(self.ops, remove_reagents(self.ops, record)?);

        let composition = self.ops.compose(&record).ok()?;
        composition
            .has_center()
            .then_some((record, composition.signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::graph::fixtures::*;
    use crate::chem::graph::{GraphChemistry, Molecule};
    use crate::generate::rules::extract_rules;

    fn seeded(chem: &GraphChemistry, id: &str) -> (ReactionRecord<Molecule>, GenerationDoc<Molecule>) {
        let source = substitution(id).tagged(ReactionType::Initial);
        let signature = chem.compose(&source).unwrap().signature;
        let doc = GenerationDoc::new(signature, source.clone());
        (source, doc)
    }

    #[test]
    fn doc_classification_rules() {
        let initial = CanonicalSignature::from("initial");
        let mut doc = GenerationDoc::new(initial.clone(), substitution("r1"));
        let novel = CanonicalSignature::from("novel");

        assert_eq!(doc.classify(&novel), Some(ReactionType::Decoy));
        assert_eq!(doc.classify(&initial), Some(ReactionType::Reconstructed));

        doc.insert(novel.clone(), substitution("r1"), ReactionType::Decoy);
        assert_eq!(doc.classify(&novel), None);

        doc.insert(initial.clone(), substitution("r1"), ReactionType::Reconstructed);
        assert_eq!(doc.classify(&initial), None);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.entries()[0].kind, ReactionType::Reconstructed);
        assert!(doc.is_recovered());
    }

    #[test]
    fn seeded_doc_is_not_recovered() {
        let doc = GenerationDoc::new(CanonicalSignature::from("s"), substitution("r1"));
        assert!(!doc.is_recovered());
        assert!(!doc.has_reconstructed());
        assert_eq!(doc.initial().reaction_type(), Some(ReactionType::Initial));
        assert!(doc.into_generated().is_empty());
    }

    #[test]
    fn strict_rule_reconstructs_the_source() {
        let chem = GraphChemistry::new();
        let (source, mut doc) = seeded(&chem, "r1");
        let rules = extract_rules(&chem, &source).unwrap();

        let classifier = DecoyClassifier::new(&chem, GenerationLimits::default());
        assert_eq!(classifier.generate(&source, &rules, &mut doc), 1);

        assert_eq!(doc.len(), 1);
        let entry = doc.get(doc.initial_signature()).unwrap();
        assert_eq!(entry.kind, ReactionType::Reconstructed);
        assert_eq!(entry.record.reaction_type(), Some(ReactionType::Reconstructed));
        assert_eq!(entry.record.reaction_id(), "r1");
        assert_eq!(doc.initial().reaction_type(), Some(ReactionType::Initial));
        assert!(doc.is_recovered());
        assert!(doc.has_reconstructed());
    }

    #[test]
    fn library_template_produces_tagged_decoy() {
        let chem = GraphChemistry::new();
        let (source, mut doc) = seeded(&chem, "r1");
        let classifier = DecoyClassifier::new(&chem, GenerationLimits::default());

        let accepted = classifier.generate(&source, &[halogen_transfer_template(7)], &mut doc);
        assert_eq!(accepted, 1);
        assert_eq!(doc.len(), 2);

        let decoy = &doc.entries()[1];
        assert_eq!(decoy.kind, ReactionType::Decoy);
        assert_eq!(decoy.record.rule_id(), Some(7));
        assert_eq!(decoy.record.reaction_id(), "r1");
        assert!(!doc.is_recovered());
    }

    #[test]
    fn rediscoveries_are_discarded() {
        let chem = GraphChemistry::new();
        let (source, mut doc) = seeded(&chem, "r1");
        let classifier = DecoyClassifier::new(&chem, GenerationLimits::default());
        let rules = [halogen_transfer_template(7), sn2_template(8)];

        assert_eq!(classifier.generate(&source, &rules, &mut doc), 2);
        assert_eq!(classifier.generate(&source, &rules, &mut doc), 0);
        assert_eq!(doc.len(), 2);

        let generated = doc.into_generated();
        assert_eq!(generated.len(), 2);
        assert_eq!(generated[0].reaction_type(), Some(ReactionType::Reconstructed));
        assert_eq!(generated[1].reaction_type(), Some(ReactionType::Decoy));
    }

    #[test]
    fn max_decoys_bounds_one_pass() {
        let chem = GraphChemistry::new();
        let (source, mut doc) = seeded(&chem, "r1");
        let limits = GenerationLimits {
            max_decoys: 1,
            limit: 5,
        };
        let classifier = DecoyClassifier::new(&chem, limits);

        let rules = [halogen_transfer_template(7), sn2_template(8)];
        assert_eq!(classifier.generate(&source, &rules, &mut doc), 1);
        assert_eq!(doc.len(), 2);
        assert!(!doc.is_recovered());
    }
}
