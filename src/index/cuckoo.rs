//! Bounded-capacity cuckoo hash index.
//!
//! Two-hashed-position cuckoo table with 4-slot buckets and a power-of-two
//! bucket count. The table never resizes: once the byte budget and the load
//! factor are both at their limits, inserts are rejected by an admission
//! predicate, and rejection is a normal, observable outcome rather than an
//! error. Displacement is bounded; an exhausted displacement chain is rolled
//! back so the table never loses a previously admitted key.

use std::mem::size_of;

use super::hash::{self, KeyHash};
use crate::{Error, Result};

/// Bucket width. Four slots per bucket keeps displacement chains short at
/// high load factors.
pub const SLOTS_PER_BUCKET: usize = 4;

/// Outcome of a [`CuckooIndex::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum InsertOutcome {
    /// The key is resident; lookups will find it.
    Admitted,
    /// The admission predicate denied the insert; the table is unchanged.
    CapacityRejected,
    /// The bounded displacement chain could not free a slot; the table has
    /// been rolled back to its prior state.
    DisplacementExhausted,
}

/// Cuckoo hash map from fixed-width substring keys to opaque value handles.
///
/// The value is semantically a handle to the key's SID set; scenarios store
/// a 32-bit sentinel so entry sizes match a 32-bit target platform.
#[derive(Debug, Clone)]
pub struct CuckooIndex<K: KeyHash, V: Copy = u32> {
    buckets: Vec<[Option<(K, V)>; SLOTS_PER_BUCKET]>,
    bucket_mask: usize,
    slot_count: usize,
    size: usize,
    max_load_factor: f64,
    max_bytes: usize,
    max_kicks: usize,
}

impl<K: KeyHash, V: Copy> CuckooIndex<K, V> {
    /// Construct with at least `slot_count` slots, rounded up to a
    /// power-of-two bucket count.
    pub fn new(slot_count: usize, max_load_factor: f64, max_bytes: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&max_load_factor) {
            return Err(Error::InvalidConfig(format!(
                "max load factor {max_load_factor} outside [0, 1]"
            )));
        }
        if slot_count == 0 {
            return Err(Error::InvalidConfig("slot count must be >= 1".into()));
        }
        let bucket_count = slot_count.div_ceil(SLOTS_PER_BUCKET).next_power_of_two();
        let slot_count = bucket_count * SLOTS_PER_BUCKET;
        // Bounded kicks, proportional to log2 of the capacity.
        let max_kicks = 8 * (slot_count.ilog2() as usize + 1);
        Ok(Self {
            buckets: vec![[None; SLOTS_PER_BUCKET]; bucket_count],
            bucket_mask: bucket_count - 1,
            slot_count,
            size: 0,
            max_load_factor,
            max_bytes,
            max_kicks,
        })
    }

    /// Insert, subject to the admission predicate. Inserting a resident key
    /// overwrites its value in place.
    pub fn insert(&mut self, key: K, value: V) -> InsertOutcome {
        if self.at_capacity() {
            return InsertOutcome::CapacityRejected;
        }

        let (primary, alternate) = self.bucket_pair(key);

        // Resident key: overwrite, no occupancy change.
        for b in [primary, alternate] {
            for slot in self.buckets[b].iter_mut() {
                if let Some((resident, v)) = slot {
                    if *resident == key {
                        *v = value;
                        return InsertOutcome::Admitted;
                    }
                }
            }
        }

        // Free slot: primary position wins, lowest slot index first.
        for b in [primary, alternate] {
            if let Some(slot) = self.free_slot(b) {
                self.buckets[b][slot] = Some((key, value));
                self.size += 1;
                return InsertOutcome::Admitted;
            }
        }

        self.displace(key, value, primary)
    }

    /// Standard cuckoo displacement starting at the primary position. The
    /// oldest resident (lowest slot index) is evicted first so the chain is
    /// deterministic. On exhaustion the chain is unwound.
    fn displace(&mut self, key: K, value: V, primary: usize) -> InsertOutcome {
        let mut cur = (key, value);
        let mut bucket = primary;
        let mut trail: Vec<usize> = Vec::with_capacity(self.max_kicks);

        for _ in 0..self.max_kicks {
            let victim = self.buckets[bucket][0]
                .replace(cur)
                .expect("cuckoo invariant violated: empty slot in a full bucket");
            trail.push(bucket);
            cur = victim;

            let alternate = self.alt_bucket(bucket, cur.0);
            if let Some(slot) = self.free_slot(alternate) {
                self.buckets[alternate][slot] = Some(cur);
                self.size += 1;
                return InsertOutcome::Admitted;
            }
            bucket = alternate;
        }

        // Unwind the chain: every swap is replayed in reverse, leaving the
        // table exactly as it was before the insert.
        for &b in trail.iter().rev() {
            cur = self.buckets[b][0]
                .replace(cur)
                .expect("cuckoo invariant violated: empty slot during rollback");
        }
        debug_assert!(cur.0 == key);
        InsertOutcome::DisplacementExhausted
    }

    pub fn contains(&self, key: K) -> bool {
        self.find(key).is_some()
    }

    /// Lookup never fails; absent keys return `None`.
    pub fn find(&self, key: K) -> Option<V> {
        let (primary, alternate) = self.bucket_pair(key);
        for b in [primary, alternate] {
            for slot in &self.buckets[b] {
                if let Some((resident, value)) = slot {
                    if *resident == key {
                        return Some(*value);
                    }
                }
            }
        }
        None
    }

    pub fn load_factor(&self) -> f64 {
        self.size as f64 / self.slot_count as f64
    }

    /// Bytes the slot array occupies on a target where entries are stored
    /// inline.
    pub fn capacity_bytes(&self) -> usize {
        self.slot_count * size_of::<(K, V)>()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = [None; SLOTS_PER_BUCKET];
        }
        self.size = 0;
    }

    /// Admission predicate: deny once the occupied bytes meet the budget
    /// AND the load factor meets its ceiling.
    fn at_capacity(&self) -> bool {
        let occupied_bytes = self.capacity_bytes() * self.size / self.slot_count;
        occupied_bytes >= self.max_bytes && self.load_factor() >= self.max_load_factor
    }

    fn bucket_pair(&self, key: K) -> (usize, usize) {
        let mixed = key.mix();
        let primary = (mixed as usize) & self.bucket_mask;
        (primary, self.alt_bucket(primary, key))
    }

    /// The partner bucket of `bucket` for `key`. Symmetric: applying it to
    /// the alternate yields the primary again.
    fn alt_bucket(&self, bucket: usize, key: K) -> usize {
        (bucket ^ hash::finalize_u64(key.mix()) as usize) & self.bucket_mask
    }

    fn free_slot(&self, bucket: usize) -> Option<usize> {
        self.buckets[bucket].iter().position(Option::is_none)
    }
}
