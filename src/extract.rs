//! Sliding-window substring extraction.
//!
//! Every pattern is cut into windows of width `K::WIDTH` at a configurable
//! stride; equal-valued windows are merged into a single bag entry whose SID
//! set is the union of all contributors. Tail fragments shorter than the
//! window are dropped, never padded.

use hashbrown::HashMap;

use crate::model::{KeyInt, PatternSet, SidSet, Substring};
use crate::{Error, Result};

/// De-duplicated collection of the substrings extracted from a pattern set.
///
/// Keyed by integer value; inserting an equal-valued entry unions the SID
/// sets into the resident and bumps its duplicate counter.
#[derive(Debug, Clone, Default)]
pub struct SubstringBag<K: KeyInt> {
    entries: HashMap<K, Substring<K>>,
}

impl<K: KeyInt> SubstringBag<K> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn insert(&mut self, substring: Substring<K>) {
        match self.entries.get_mut(&substring.key()) {
            Some(resident) => {
                resident.merge_sids(substring.sids());
                resident.log_duplicate();
            }
            None => {
                self.entries.insert(substring.key(), substring);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: K) -> Option<&Substring<K>> {
        self.entries.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substring<K>> {
        self.entries.values()
    }

    /// Sum of the duplicate counters across the bag — how many windows were
    /// merged away during extraction.
    pub fn total_duplicates(&self) -> usize {
        self.entries.values().map(|s| s.num_duplicates()).sum()
    }

    /// Union of the SID sets of every entry.
    pub fn unique_sids(&self) -> SidSet {
        let mut all = SidSet::new();
        for s in self.entries.values() {
            all.extend(s.sids().iter().copied());
        }
        all
    }

    /// Drain into a vector ordered by key, the canonical order scenarios
    /// shuffle from.
    pub fn into_entries(self) -> Vec<Substring<K>> {
        let mut entries: Vec<_> = self.entries.into_values().collect();
        entries.sort_unstable();
        entries
    }
}

/// Extract every width-`K::WIDTH`, stride-`stride` window from every pattern
/// in the set. Patterns shorter than the window contribute nothing; a stride
/// of zero is rejected.
pub fn extract<K: KeyInt>(patterns: &PatternSet, stride: usize) -> Result<SubstringBag<K>> {
    if stride == 0 {
        return Err(Error::InvalidConfig("substring stride must be >= 1".into()));
    }
    let mut bag = SubstringBag::new();
    for pattern in patterns.iter() {
        extract_into(&pattern.bytes, &pattern.sids, stride, &mut bag);
    }
    Ok(bag)
}

/// Window loop for a single pattern. Offsets run 0, stride, 2·stride, …
/// while a full window still fits.
fn extract_into<K: KeyInt>(
    bytes: &[u8],
    sids: &SidSet,
    stride: usize,
    bag: &mut SubstringBag<K>,
) {
    let width = K::WIDTH;
    if bytes.len() < width {
        return;
    }
    let mut offset = 0;
    while offset + width <= bytes.len() {
        let window = &bytes[offset..offset + width];
        bag.insert(Substring::from_window(window, sids.clone()));
        offset += stride;
    }
}
