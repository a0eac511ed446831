//! Pattern records — the `(bytes, SIDs)` pairs both indexes consume.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of rule identifiers a pattern belongs to.
///
/// Ordered so unions, serialized reports, and test expectations are
/// deterministic.
pub type SidSet = BTreeSet<u32>;

/// An exact-match byte string extracted from an upstream rule, tagged with
/// every SID that carries it. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub bytes: Vec<u8>,
    pub sids: SidSet,
}

impl Pattern {
    pub fn new(bytes: Vec<u8>, sids: SidSet) -> Self {
        Self { bytes, sids }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Append-only ordered collection of pattern records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: Vec<u8>, sids: SidSet) {
        self.patterns.push(Pattern::new(bytes, sids));
    }

    pub fn insert(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Union of every pattern's SIDs — the rule corpus this set covers.
    pub fn unique_sids(&self) -> SidSet {
        let mut all = SidSet::new();
        for p in &self.patterns {
            all.extend(p.sids.iter().copied());
        }
        all
    }

    /// Derived `bytes → SIDs` map, used by the Aho-Corasick search path to
    /// attribute emits back to rules. Patterns appearing more than once
    /// contribute the union of their SID sets.
    pub fn sid_map(&self) -> HashMap<Vec<u8>, SidSet> {
        let mut map: HashMap<Vec<u8>, SidSet> = HashMap::new();
        for p in &self.patterns {
            map.entry(p.bytes.clone())
                .or_default()
                .extend(p.sids.iter().copied());
        }
        map
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}
