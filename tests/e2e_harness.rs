//! End-to-end tests for the full pipeline: record text -> PatternSet ->
//! index scenarios -> search reports -> JSON serialization.

use pretty_assertions::assert_eq;
use sigbench::harness::{
    self, AcScenario, CuckooScenario, KeyWidth,
};
use sigbench::{load_patterns, parse_queries, SidSet};

fn pattern_file() -> &'static str {
    concat!(
        r#"{"exact_match_hex": ["0x73", "0x6e", "0x6f", "0x72", "0x74"], "rules": [2001]}"#,
        "\n",
        r#"{"exact_match_hex": ["0x73", "0x65", "0x72", "0x76", "0x65", "0x72"], "rules": [2002, 2003]}"#,
        "\n",
        r#"{"exact_match_hex": ["0x65", "0x72", "0x76", "0x65"], "rules": [2004], "signature_type": "pcre"}"#,
        "\n",
    )
}

fn query_file() -> &'static str {
    r#"[
        {"sids": [2001], "hex_string_example": "73 6E 6F 72 74"},
        {"sids": [2002, 2003], "hex_string_example": "00 73 65 72 76 65 72 00"}
    ]"#
}

// ============================================================================
// 1. Record loading: byte concatenation, SID dedup, error collection
// ============================================================================

#[test]
fn test_load_pattern_records() {
    let (patterns, errors) = load_patterns(pattern_file());
    assert!(errors.is_empty());
    assert_eq!(patterns.len(), 3);

    let loaded: Vec<_> = patterns.iter().collect();
    assert_eq!(loaded[0].bytes, b"snort".to_vec());
    assert_eq!(loaded[0].sids, SidSet::from([2001]));
    assert_eq!(loaded[1].bytes, b"server".to_vec());
    assert_eq!(loaded[1].sids, SidSet::from([2002, 2003]));
    assert_eq!(loaded[2].bytes, b"erve".to_vec());
}

// ============================================================================
// 2. Cuckoo scenario over loaded records
// ============================================================================

#[test]
fn test_cuckoo_scenario_pipeline() {
    let (patterns, _) = load_patterns(pattern_file());
    let scenario = CuckooScenario::new(KeyWidth::W4, 1, 8 * 1024)
        .with_trials(5)
        .with_seed(2847354131);
    let report = harness::run_cuckoo_scenario(&patterns, &scenario).unwrap();

    // snort: 2 windows, server: 3, erve: 1. "erve" duplicates a window of
    // "server", so 5 distinct keys and 1 merge.
    assert_eq!(report.substrings_extracted, 5);
    assert_eq!(report.duplicates_merged, 1);
    assert_eq!(report.admitted_keys, 5.0);
    assert_eq!(report.sids_covered, 4.0);
    assert_eq!(report.rule_coverage, 1.0);
    assert!(report.load_factor > 0.0);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"table_bytes\""));
    assert!(json.contains("\"avg_runtime_ms\""));
}

// ============================================================================
// 3. Cuckoo search: windows attribute hits back to SIDs
// ============================================================================

#[test]
fn test_cuckoo_search_pipeline() {
    let (patterns, _) = load_patterns(pattern_file());
    let queries = parse_queries(query_file()).unwrap();
    let index = harness::build_cuckoo_index::<u32>(&patterns, 1, 0.95, 8 * 1024).unwrap();
    let reports = harness::search_cuckoo(&index, &queries);

    assert_eq!(reports.len(), 2);

    // "snort" payload: windows snor + nort, both tagged 2001 only.
    assert_eq!(reports[0].search_key, "0x736e6f7274");
    assert_eq!(reports[0].sid_hit_histogram.get(&2001), Some(&2));
    assert_eq!(reports[0].sid_hit_histogram.get(&2002), None);

    // "server" payload embedded in NULs: serv/erve/rver windows hit the
    // server SIDs; the shared erve window also hits 2004.
    let histogram = &reports[1].sid_hit_histogram;
    assert_eq!(histogram.get(&2002), Some(&3));
    assert_eq!(histogram.get(&2003), Some(&3));
    assert_eq!(histogram.get(&2004), Some(&1));

    assert!(reports[1].size_bytes > 0);
    assert!(reports[1].iblt.recover_100 >= reports[1].iblt.optimal);
}

// ============================================================================
// 4. Aho-Corasick scenario and search over the same corpus
// ============================================================================

#[test]
fn test_ac_pipeline() {
    let (patterns, _) = load_patterns(pattern_file());
    let report = harness::run_ac_scenario(&patterns, &AcScenario::default());
    assert_eq!(report.patterns_inserted, 3);
    assert!(report.node_bytes > 0);
    assert!(report.theoretical_bytes < report.full_bytes);

    let ac = harness::build_aho_corasick(&patterns, &AcScenario::default());
    let queries = parse_queries(query_file()).unwrap();
    let reports = harness::search_ac(&ac, &patterns, &queries);

    assert_eq!(reports[0].sid_hit_histogram.get(&2001), Some(&1));
    // "server" contains the standalone "erve" pattern as well.
    assert_eq!(reports[1].sid_hit_histogram.get(&2002), Some(&1));
    assert_eq!(reports[1].sid_hit_histogram.get(&2003), Some(&1));
    assert_eq!(reports[1].sid_hit_histogram.get(&2004), Some(&1));
    assert_eq!(reports[1].expected_sids, SidSet::from([2002, 2003]));
}

// ============================================================================
// 5. Substring log round-trips through JSON
// ============================================================================

#[test]
fn test_substring_log_serialization() {
    let (patterns, _) = load_patterns(pattern_file());
    let bag = sigbench::extract::<u32>(&patterns, 1).unwrap();
    let log = harness::log_substrings(&bag);
    assert_eq!(log.len(), 5);

    let erve = log.iter().find(|r| r.gloss == "erve").unwrap();
    assert_eq!(erve.num_duplicates, 1);
    assert_eq!(erve.rules, SidSet::from([2002, 2003, 2004]));

    let json = serde_json::to_string_pretty(&log).unwrap();
    assert!(json.contains("\"hex\": \"0x65727665\""));
}

// ============================================================================
// 6. Deterministic reports under a fixed shuffle seed
// ============================================================================

#[test]
fn test_seeded_scenarios_are_reproducible() {
    let (patterns, _) = load_patterns(pattern_file());
    let scenario = CuckooScenario::new(KeyWidth::W2, 1, 4 * 1024)
        .with_trials(3)
        .with_seed(7);

    let a = harness::run_cuckoo_scenario(&patterns, &scenario).unwrap();
    let b = harness::run_cuckoo_scenario(&patterns, &scenario).unwrap();
    assert_eq!(a.admitted_keys, b.admitted_keys);
    assert_eq!(a.load_factor, b.load_factor);
    assert_eq!(a.sids_covered, b.sids_covered);
}
