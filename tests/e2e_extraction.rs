//! End-to-end tests for hex decoding and substring extraction.
//!
//! Each test exercises: pattern bytes -> sliding-window extraction ->
//! de-duplicated bag, over the documented window widths and strides.

use proptest::prelude::*;
use sigbench::model::{bytes_to_uint, decode_hex, uint_to_bytes};
use sigbench::{extract, PatternSet, SidSet};

// ============================================================================
// 1. "snort" at L=4, G=1: two windows, no duplicates
// ============================================================================

#[test]
fn test_snort_windows() {
    let mut patterns = PatternSet::new();
    patterns.push(decode_hex("0x736E6F7274").unwrap(), SidSet::from([12]));

    let bag = extract::<u32>(&patterns, 1).unwrap();
    assert_eq!(bag.len(), 2);
    assert!(bag.contains(0x736e6f72));
    assert!(bag.contains(0x6e6f7274));
    assert_eq!(bag.get(0x736e6f72).unwrap().num_duplicates(), 0);
    assert_eq!(bag.get(0x6e6f7274).unwrap().num_duplicates(), 0);
}

// ============================================================================
// 2. Exactly one full-width window at L=8
// ============================================================================

#[test]
fn test_exact_width_pattern() {
    let mut patterns = PatternSet::new();
    patterns.push(
        decode_hex("0x0102030405060708").unwrap(),
        SidSet::from([5, 6]),
    );

    let bag = extract::<u64>(&patterns, 1).unwrap();
    assert_eq!(bag.len(), 1);
    let entry = bag.get(0x0102030405060708).unwrap();
    assert_eq!(entry.sids(), &SidSet::from([5, 6]));
}

// ============================================================================
// 3. Equal windows from different rules merge by SID union
// ============================================================================

#[test]
fn test_duplicate_windows_merge() {
    let mut patterns = PatternSet::new();
    patterns.push(b"ab".to_vec(), SidSet::from([1]));
    patterns.push(b"ab".to_vec(), SidSet::from([2]));

    let bag = extract::<u16>(&patterns, 1).unwrap();
    assert_eq!(bag.len(), 1);
    let entry = bag.get(0x6162).unwrap();
    assert_eq!(entry.sids(), &SidSet::from([1, 2]));
    assert_eq!(entry.num_duplicates(), 1);
    assert_eq!(bag.total_duplicates(), 1);
}

// ============================================================================
// 4. Duplicate counting across many occurrences
// ============================================================================

#[test]
fn test_duplicate_counter_is_occurrences_minus_one() {
    let mut patterns = PatternSet::new();
    patterns.push(b"aaaa".to_vec(), SidSet::from([1])); // three "aa" windows
    patterns.push(b"aa".to_vec(), SidSet::from([2])); // one more

    let bag = extract::<u16>(&patterns, 1).unwrap();
    assert_eq!(bag.len(), 1);
    let entry = bag.get(0x6161).unwrap();
    assert_eq!(entry.num_duplicates(), 3);
    assert_eq!(entry.sids(), &SidSet::from([1, 2]));
}

// ============================================================================
// 5. Properties: round trips and window counts
// ============================================================================

proptest! {
    #[test]
    fn prop_uint_round_trip(bytes in proptest::collection::vec(any::<u8>(), 1..=8)) {
        let width = bytes.len();
        prop_assert_eq!(uint_to_bytes(bytes_to_uint(&bytes), width), bytes);
    }

    #[test]
    fn prop_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        let literal: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        prop_assert_eq!(decode_hex(&literal).unwrap(), bytes);
    }

    #[test]
    fn prop_window_count(
        len in 0usize..40,
        stride in 1usize..5,
    ) {
        let mut patterns = PatternSet::new();
        patterns.push((0..len as u8).collect(), SidSet::from([1]));
        let bag = extract::<u32>(&patterns, stride).unwrap();

        let expected = if len < 4 { 0 } else { (len - 4) / stride + 1 };
        prop_assert_eq!(bag.len() + bag.total_duplicates(), expected);
    }

    #[test]
    fn prop_extracted_sids_cover_source(
        body in proptest::collection::vec(any::<u8>(), 0..24),
        sid in any::<u32>(),
    ) {
        let mut patterns = PatternSet::new();
        patterns.push(body, SidSet::from([sid]));
        let bag = extract::<u16>(&patterns, 1).unwrap();
        for entry in bag.iter() {
            prop_assert!(entry.sids().contains(&sid));
        }
    }
}
