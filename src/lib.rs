//! # sigbench — Multi-Pattern Matching Index Harness
//!
//! An experimental evaluation harness for two complementary multi-pattern
//! matching indexes over a corpus of intrusion-detection signature patterns
//! (exact-match byte strings extracted from upstream rule files).
//!
//! ## Design Principles
//!
//! 1. **Instance-scoped**: every index owns all of its state; no globals
//! 2. **Clean DTOs**: `Pattern`, `Substring`, `Emit` cross all boundaries
//! 3. **Parsing owns nothing**: record text → `PatternSet` is a pure function
//! 4. **The harness performs no I/O**: callers serialize the returned reports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sigbench::{AhoCorasick, AcOptions, PatternSet, SidSet};
//! use sigbench::harness::{self, CuckooScenario, KeyWidth};
//!
//! # fn example() -> sigbench::Result<()> {
//! let mut patterns = PatternSet::new();
//! patterns.push(b"snort".to_vec(), SidSet::from([2001]));
//! patterns.push(b"server".to_vec(), SidSet::from([2002, 2003]));
//!
//! // Cuckoo index: 4-byte windows at stride 1, shuffled insertion trials.
//! let scenario = CuckooScenario::new(KeyWidth::W4, 1, 64 * 1024);
//! let report = harness::run_cuckoo_scenario(&patterns, &scenario)?;
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//!
//! // Aho-Corasick automaton over the full patterns.
//! let mut ac = AhoCorasick::new(AcOptions::default());
//! for p in patterns.iter() {
//!     ac.insert(&p.bytes);
//! }
//! for emit in ac.scan(b"ushers connect to the snort server") {
//!     println!("{:?} at [{}, {}]", emit.bytes, emit.start, emit.end);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Indexes
//!
//! | Index | Module | Keyed by |
//! |-------|--------|----------|
//! | Cuckoo | `index::cuckoo` | Fixed-width substrings (L ∈ {1, 2, 4, 8}) |
//! | Aho-Corasick | `ac` | Variable-length original patterns |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod extract;
pub mod index;
pub mod ac;
pub mod input;
pub mod harness;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Pattern, PatternSet, SidSet, Substring, KeyInt,
    decode_hex, encode_hex, bytes_to_uint, uint_to_bytes,
};

// ============================================================================
// Re-exports: Indexes
// ============================================================================

pub use extract::{SubstringBag, extract};
pub use index::{CuckooIndex, InsertOutcome, KeyHash};
pub use ac::{AhoCorasick, AcOptions, Emit, Token, TrieShape};
pub use ac::interval::{Interval, IntervalTree};

// ============================================================================
// Re-exports: Input records
// ============================================================================

pub use input::{Query, RecordError, load_patterns, parse_queries};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed hex literal {literal:?}: {reason}")]
    MalformedHex { literal: String, reason: String },

    #[error("Record parse error at line {line}: {message}")]
    RecordParse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
