//! # Substring Index
//!
//! The bounded-capacity cuckoo hash index and the deterministic key hash it
//! is built on. One instance per scenario; the table never resizes —
//! admission is gated by a load-factor and byte-budget predicate instead.

pub mod hash;
pub mod cuckoo;

pub use cuckoo::{CuckooIndex, InsertOutcome, SLOTS_PER_BUCKET};
pub use hash::KeyHash;
