//! # Pattern Data Model
//!
//! Clean DTOs shared by both indexes: hex codecs, pattern records, and the
//! fixed-width substring keys stored in the cuckoo table.
//!
//! Design rule: this module is pure data — no I/O, no locks, no clocks.

pub mod hex;
pub mod pattern;
pub mod substring;

pub use hex::{decode_hex, decode_spaced_hex, encode_hex, bytes_to_uint, uint_to_bytes};
pub use pattern::{Pattern, PatternSet, SidSet};
pub use substring::{KeyInt, Substring};
