use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::reaction::ReactionRecord;
use crate::model::signature::CanonicalSignature;
use crate::model::types::ReactionType;

/// Which of two records sharing a signature survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Existing,
    Incoming,
}

/// Conflict resolution between records with equal signatures.
pub trait ResolutionPolicy {
    /// `existing` is the record seen first, `incoming` the later one.
    fn resolve(&self, existing: Option<ReactionType>, incoming: Option<ReactionType>) -> Winner;
}

/// A later `Reconstructed` record displaces whatever came before; in every
/// other case the first record stays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructedFirst;

impl ResolutionPolicy for ReconstructedFirst {
    fn resolve(&self, _existing: Option<ReactionType>, incoming: Option<ReactionType>) -> Winner {
        if incoming == Some(ReactionType::Reconstructed) {
            Winner::Incoming
        } else {
            Winner::Existing
        }
    }
}

/// Result of offering a record to a [`MergeAccumulator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Offer<M> {
    Inserted,
    /// The incoming record won; carries the displaced one.
    Replaced(ReactionRecord<M>),
    /// The existing record won; carries the rejected incoming one.
    Dropped(ReactionRecord<M>),
}

/// Outcome counts of reconciling two accumulators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Older entries removed in favor of newer ones.
    pub replaced: usize,
    /// Newer entries removed in favor of older ones.
    pub dropped: usize,
}

/// Signature-keyed record map that remembers insertion order.
///
/// Serializes as a JSON object whose key order is the insertion order, which
/// is the shape of one merge chunk block.
#[derive(Debug, Clone)]
pub struct MergeAccumulator<M> {
    slots: Vec<Option<(CanonicalSignature, ReactionRecord<M>)>>,
    index: HashMap<CanonicalSignature, usize>,
}

impl<M> Default for MergeAccumulator<M> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<M> MergeAccumulator<M> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, signature: &CanonicalSignature) -> bool {
        self.index.contains_key(signature)
    }

    pub fn get(&self, signature: &CanonicalSignature) -> Option<&ReactionRecord<M>> {
        self.index
            .get(signature)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map(|(_, record)| record)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalSignature, &ReactionRecord<M>)> {
        self.slots
            .iter()
            .flatten()
            .map(|(signature, record)| (signature, record))
    }

    pub fn records(&self) -> impl Iterator<Item = &ReactionRecord<M>> {
        self.iter().map(|(_, record)| record)
    }

    pub fn into_records(self) -> impl Iterator<Item = ReactionRecord<M>> {
        self.slots.into_iter().flatten().map(|(_, record)| record)
    }

    /// Stores `record` under `signature`; an existing entry is overwritten
    /// in place.
    pub fn put(&mut self, signature: CanonicalSignature, record: ReactionRecord<M>) {
        match self.index.get(&signature) {
            Some(&slot) => self.slots[slot] = Some((signature, record)),
            None => self.push(signature, record),
        }
    }

    pub fn remove(&mut self, signature: &CanonicalSignature) -> Option<ReactionRecord<M>> {
        let slot = self.index.remove(signature)?;
        let removed = self.slots[slot].take().map(|(_, record)| record);
        if self.slots.len() > 2 * self.index.len() + 64 {
            self.compact();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    /// Offers `record` under `signature`, letting `policy` settle a conflict.
    ///
    /// A winning incoming record is moved to the end of the insertion order.
    pub fn offer<P: ResolutionPolicy + ?Sized>(
        &mut self,
        signature: CanonicalSignature,
        record: ReactionRecord<M>,
        policy: &P,
    ) -> Offer<M> {
        let Some(existing) = self.get(&signature) else {
            self.push(signature, record);
            return Offer::Inserted;
        };
        match policy.resolve(existing.reaction_type(), record.reaction_type()) {
            Winner::Existing => Offer::Dropped(record),
            Winner::Incoming => {
                let displaced = self.remove(&signature);
                self.push(signature, record);
                match displaced {
                    Some(displaced) => Offer::Replaced(displaced),
                    None => Offer::Inserted,
                }
            }
        }
    }

    /// Settles every signature present both here and in `older`, removing
    /// the losing entry from whichever side holds it.
    pub fn reconcile<P: ResolutionPolicy + ?Sized>(
        &mut self,
        older: &mut MergeAccumulator<M>,
        policy: &P,
    ) -> Reconciliation {
        let shared: Vec<CanonicalSignature> = self
            .index
            .keys()
            .filter(|signature| older.contains(signature))
            .cloned()
            .collect();

        let mut outcome = Reconciliation::default();
        for signature in shared {
            let existing = older.get(&signature).and_then(ReactionRecord::reaction_type);
            let incoming = self.get(&signature).and_then(ReactionRecord::reaction_type);
            match policy.resolve(existing, incoming) {
                Winner::Incoming => {
                    older.remove(&signature);
                    outcome.replaced += 1;
                }
                Winner::Existing => {
                    self.remove(&signature);
                    outcome.dropped += 1;
                }
            }
        }
        outcome
    }

    fn push(&mut self, signature: CanonicalSignature, record: ReactionRecord<M>) {
        self.index.insert(signature.clone(), self.slots.len());
        self.slots.push(Some((signature, record)));
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some((signature, _)) = entry {
                self.index.insert(signature.clone(), slot);
            }
        }
    }
}

impl<M> FromIterator<(CanonicalSignature, ReactionRecord<M>)> for MergeAccumulator<M> {
    fn from_iter<I: IntoIterator<Item = (CanonicalSignature, ReactionRecord<M>)>>(iter: I) -> Self {
        let mut accumulator = Self::new();
        for (signature, record) in iter {
            accumulator.put(signature, record);
        }
        accumulator
    }
}

impl<M: Serialize> Serialize for MergeAccumulator<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (signature, record) in self.iter() {
            map.serialize_entry(signature, record)?;
        }
        map.end()
    }
}

struct AccumulatorVisitor<M>(PhantomData<fn() -> M>);

impl<'de, M: Deserialize<'de>> Visitor<'de> for AccumulatorVisitor<M> {
    type Value = MergeAccumulator<M>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of reaction signatures to reaction records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut accumulator = MergeAccumulator::new();
        while let Some((signature, record)) =
            map.next_entry::<CanonicalSignature, ReactionRecord<M>>()?
        {
            accumulator.put(signature, record);
        }
        Ok(accumulator)
    }
}

impl<'de, M: Deserialize<'de>> Deserialize<'de> for MergeAccumulator<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AccumulatorVisitor(PhantomData))
    }
}
