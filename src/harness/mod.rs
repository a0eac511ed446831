//! # Scenario Harness
//!
//! Thin orchestration over the two indexes: build from a `PatternSet`, run
//! insertion trials or search scenarios, and return serializable report
//! structures. The harness performs no I/O and installs no subscriber —
//! callers persist the reports and wire up logging however they like.

use std::collections::BTreeMap;
use std::mem::size_of;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ac::{AcOptions, AhoCorasick};
use crate::extract::{self, SubstringBag};
use crate::index::{CuckooIndex, InsertOutcome, KeyHash, SLOTS_PER_BUCKET};
use crate::model::{KeyInt, PatternSet, SidSet, Substring};
use crate::{Error, Result};

pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;
pub const DEFAULT_NUM_TRIALS: usize = 100;

// ============================================================================
// Scenario descriptors
// ============================================================================

/// Substring window width in bytes; picks the key integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyWidth {
    W1,
    W2,
    W4,
    W8,
}

impl KeyWidth {
    pub fn bytes(self) -> usize {
        match self {
            KeyWidth::W1 => 1,
            KeyWidth::W2 => 2,
            KeyWidth::W4 => 4,
            KeyWidth::W8 => 8,
        }
    }

    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(KeyWidth::W1),
            2 => Ok(KeyWidth::W2),
            4 => Ok(KeyWidth::W4),
            8 => Ok(KeyWidth::W8),
            other => Err(Error::InvalidConfig(format!(
                "window width {other} not in {{1, 2, 4, 8}}"
            ))),
        }
    }
}

/// One cuckoo-index experiment: extraction parameters, the table's
/// admission limits, and how many shuffled insertion trials to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuckooScenario {
    pub width: KeyWidth,
    pub stride: usize,
    pub max_load_factor: f64,
    pub max_bytes: usize,
    /// Zero means "produce shape measurements only".
    pub num_trials: usize,
    /// Fixed seed for the inter-trial shuffle; `None` draws from entropy.
    pub shuffle_seed: Option<u64>,
}

impl CuckooScenario {
    pub fn new(width: KeyWidth, stride: usize, max_bytes: usize) -> Self {
        Self {
            width,
            stride,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            max_bytes,
            num_trials: DEFAULT_NUM_TRIALS,
            shuffle_seed: None,
        }
    }

    pub fn with_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

/// One automaton experiment: scan options plus the minimum pattern length
/// admitted into the trie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcScenario {
    pub options: AcOptions,
    pub length_threshold: usize,
}

impl Default for AcScenario {
    fn default() -> Self {
        Self {
            options: AcOptions::default(),
            length_threshold: 0,
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Per-scenario cuckoo measurements, averaged over the insertion trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuckooReport {
    /// Bytes of the slot array actually allocated.
    pub table_bytes: usize,
    /// Bytes the admitted keys' SID lists would occupy (4 bytes per SID),
    /// averaged over trials.
    pub additional_bytes: usize,
    /// Average of the per-trial maximum load factor.
    pub load_factor: f64,
    pub admitted_keys: f64,
    /// Average count of distinct SIDs covered by admitted keys.
    pub sids_covered: f64,
    /// `sids_covered` as a fraction of the corpus.
    pub rule_coverage: f64,
    pub substrings_extracted: usize,
    pub duplicates_merged: usize,
    /// Average displacement-exhausted inserts per trial.
    pub displacement_failures: f64,
    pub avg_runtime_ms: f64,
    pub trials: usize,
}

/// Per-scenario automaton shape measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcReport {
    /// Transition storage only.
    pub node_bytes: usize,
    pub edge_count: usize,
    /// Minimal rendition: one byte per edge plus one failure index per node.
    pub theoretical_bytes: usize,
    /// Transitions, per-node peripherals, and emit lists.
    pub full_bytes: usize,
    /// Transitions and per-node peripherals, without emit lists.
    pub no_emits_bytes: usize,
    pub patterns_inserted: usize,
    pub length_threshold: usize,
    pub runtime_ms: f64,
}

/// Informational byte projections for an invertible Bloom lookup table
/// sized to recover every key's SID list. Derived from entry counts and
/// SID-list sizes only; no IBLT is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IbltProjection {
    pub optimal: usize,
    pub recover_100: usize,
    pub recover_99: usize,
    pub recover_95: usize,
}

/// Per-query search outcome: which SIDs the index attributes to the
/// payload, and how often.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub search_key: String,
    pub expected_sids: SidSet,
    pub sid_hit_histogram: BTreeMap<u32, u32>,
    /// Size of the index that served the query.
    pub size_bytes: usize,
    /// Bytes to store every entry's full SID list.
    pub full_list_bytes: usize,
    pub iblt: IbltProjection,
}

/// One extracted substring, rendered for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstringRecord {
    pub uint_key: u64,
    pub hex: String,
    pub gloss: String,
    pub num_duplicates: usize,
    pub rules: SidSet,
}

// ============================================================================
// Cuckoo scenarios
// ============================================================================

/// Run the shuffled insertion trials of a cuckoo scenario.
pub fn run_cuckoo_scenario(patterns: &PatternSet, scenario: &CuckooScenario) -> Result<CuckooReport> {
    match scenario.width {
        KeyWidth::W1 => run_cuckoo_typed::<u8>(patterns, scenario),
        KeyWidth::W2 => run_cuckoo_typed::<u16>(patterns, scenario),
        KeyWidth::W4 => run_cuckoo_typed::<u32>(patterns, scenario),
        KeyWidth::W8 => run_cuckoo_typed::<u64>(patterns, scenario),
    }
}

/// Run one scenario per byte budget, mirroring an increasing-table-size
/// sweep.
pub fn run_cuckoo_sweep(
    patterns: &PatternSet,
    scenario: &CuckooScenario,
    byte_budgets: &[usize],
) -> Result<Vec<CuckooReport>> {
    byte_budgets
        .iter()
        .map(|&max_bytes| {
            let scenario = CuckooScenario {
                max_bytes,
                ..scenario.clone()
            };
            run_cuckoo_scenario(patterns, &scenario)
        })
        .collect()
}

fn run_cuckoo_typed<K: KeyHash>(
    patterns: &PatternSet,
    scenario: &CuckooScenario,
) -> Result<CuckooReport> {
    let bag = extract::extract::<K>(patterns, scenario.stride)?;
    let substrings_extracted = bag.len();
    let duplicates_merged = bag.total_duplicates();
    let corpus_sids = patterns.unique_sids().len();
    let mut entries = bag.into_entries();

    let entry_bytes = size_of::<(K, u32)>();
    let slot_count = (scenario.max_bytes / entry_bytes).max(SLOTS_PER_BUCKET);
    let table_bytes = CuckooIndex::<K>::new(slot_count, scenario.max_load_factor, scenario.max_bytes)?
        .capacity_bytes();

    info!(
        width = K::WIDTH,
        stride = scenario.stride,
        substrings = substrings_extracted,
        duplicates = duplicates_merged,
        trials = scenario.num_trials,
        table_bytes,
        "running cuckoo scenario"
    );

    let mut report = CuckooReport {
        table_bytes,
        additional_bytes: 0,
        load_factor: 0.0,
        admitted_keys: 0.0,
        sids_covered: 0.0,
        rule_coverage: 0.0,
        substrings_extracted,
        duplicates_merged,
        displacement_failures: 0.0,
        avg_runtime_ms: 0.0,
        trials: scenario.num_trials,
    };
    if scenario.num_trials == 0 {
        return Ok(report);
    }

    let mut rng = match scenario.shuffle_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut sum_load_factor = 0.0;
    let mut sum_admitted = 0usize;
    let mut sum_covered = 0usize;
    let mut sum_additional = 0usize;
    let mut sum_exhausted = 0usize;
    let mut sum_runtime_ms = 0.0;

    for trial in 0..scenario.num_trials {
        entries.shuffle(&mut rng);

        let started = Instant::now();
        let mut table: CuckooIndex<K> =
            CuckooIndex::new(slot_count, scenario.max_load_factor, scenario.max_bytes)?;
        let mut covered = SidSet::new();
        let mut admitted = 0usize;
        let mut additional = 0usize;
        let mut exhausted = 0usize;
        let mut max_load_factor = 0.0f64;

        for (handle, entry) in entries.iter().enumerate() {
            match table.insert(entry.key(), handle as u32) {
                InsertOutcome::Admitted => {
                    admitted += 1;
                    additional += entry.sids().len() * size_of::<u32>();
                    covered.extend(entry.sids().iter().copied());
                    max_load_factor = max_load_factor.max(table.load_factor());
                }
                InsertOutcome::CapacityRejected => break,
                InsertOutcome::DisplacementExhausted => exhausted += 1,
            }
        }
        let runtime_ms = started.elapsed().as_secs_f64() * 1e3;

        debug!(
            trial,
            admitted,
            covered = covered.len(),
            exhausted,
            load_factor = max_load_factor,
            runtime_ms,
            "cuckoo trial finished"
        );

        sum_load_factor += max_load_factor;
        sum_admitted += admitted;
        sum_covered += covered.len();
        sum_additional += additional;
        sum_exhausted += exhausted;
        sum_runtime_ms += runtime_ms;
    }

    let trials = scenario.num_trials as f64;
    report.load_factor = sum_load_factor / trials;
    report.admitted_keys = sum_admitted as f64 / trials;
    report.sids_covered = sum_covered as f64 / trials;
    report.rule_coverage = if corpus_sids > 0 {
        report.sids_covered / corpus_sids as f64
    } else {
        0.0
    };
    report.additional_bytes = (sum_additional as f64 / trials).round() as usize;
    report.displacement_failures = sum_exhausted as f64 / trials;
    report.avg_runtime_ms = sum_runtime_ms / trials;
    Ok(report)
}

/// Render a bag for the substring log, ordered by key.
pub fn log_substrings<K: KeyInt>(bag: &SubstringBag<K>) -> Vec<SubstringRecord> {
    let mut entries: Vec<&Substring<K>> = bag.iter().collect();
    entries.sort_unstable();
    entries
        .into_iter()
        .map(|s| SubstringRecord {
            uint_key: s.key().to_u64(),
            hex: s.hex(),
            gloss: s.gloss(),
            num_duplicates: s.num_duplicates(),
            rules: s.sids().clone(),
        })
        .collect()
}

// ============================================================================
// Cuckoo search
// ============================================================================

/// A populated cuckoo table plus the SID sets its value handles point at.
pub struct CuckooSearchIndex<K: KeyHash> {
    pub table: CuckooIndex<K>,
    pub sid_sets: Vec<SidSet>,
}

/// Extract, then fill a table in canonical key order. Values are handles
/// into `sid_sets`.
pub fn build_cuckoo_index<K: KeyHash>(
    patterns: &PatternSet,
    stride: usize,
    max_load_factor: f64,
    max_bytes: usize,
) -> Result<CuckooSearchIndex<K>> {
    let bag = extract::extract::<K>(patterns, stride)?;
    let entries = bag.into_entries();

    let entry_bytes = size_of::<(K, u32)>();
    let slot_count = (max_bytes / entry_bytes).max(SLOTS_PER_BUCKET);
    let mut table: CuckooIndex<K> = CuckooIndex::new(slot_count, max_load_factor, max_bytes)?;
    let mut sid_sets = Vec::with_capacity(entries.len());

    for entry in &entries {
        let handle = sid_sets.len() as u32;
        if table.insert(entry.key(), handle) == InsertOutcome::Admitted {
            sid_sets.push(entry.sids().clone());
        }
    }
    Ok(CuckooSearchIndex { table, sid_sets })
}

/// Scan each query payload against the cuckoo index: every width-L window
/// at stride 1 that hits an admitted key scores one hit per SID in the
/// key's set.
pub fn search_cuckoo<K: KeyHash>(
    index: &CuckooSearchIndex<K>,
    queries: &[crate::input::Query],
) -> Vec<SearchReport> {
    let full_list_bytes: usize = index
        .sid_sets
        .iter()
        .map(|s| s.len() * size_of::<u32>())
        .sum();
    let iblt = iblt_projection(index.table.size(), full_list_bytes);

    queries
        .iter()
        .map(|query| {
            let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();
            if query.bytes.len() >= K::WIDTH {
                for window in query.bytes.windows(K::WIDTH) {
                    let key = K::from_be_window(window);
                    if let Some(handle) = index.table.find(key) {
                        for &sid in &index.sid_sets[handle as usize] {
                            *histogram.entry(sid).or_insert(0) += 1;
                        }
                    }
                }
            }
            SearchReport {
                search_key: query.search_key.clone(),
                expected_sids: query.sids.clone(),
                sid_hit_histogram: histogram,
                size_bytes: index.table.capacity_bytes(),
                full_list_bytes,
                iblt,
            }
        })
        .collect()
}

// ============================================================================
// Aho-Corasick scenarios
// ============================================================================

/// Build an automaton from every pattern at least `length_threshold` bytes
/// long.
pub fn build_aho_corasick(patterns: &PatternSet, scenario: &AcScenario) -> AhoCorasick {
    let mut ac = AhoCorasick::new(scenario.options);
    for pattern in patterns.iter() {
        if !pattern.is_empty() && pattern.len() >= scenario.length_threshold {
            ac.insert(&pattern.bytes);
        }
    }
    ac
}

/// Build the automaton, force the failure graph, and measure its shape.
pub fn run_ac_scenario(patterns: &PatternSet, scenario: &AcScenario) -> AcReport {
    let started = Instant::now();
    let ac = build_aho_corasick(patterns, scenario);
    ac.scan(&[]); // materialize the failure graph before measuring
    let shape = ac.traverse();
    let runtime_ms = started.elapsed().as_secs_f64() * 1e3;

    // Per-node peripherals: depth and failure link, one u32 each.
    let peripheral_bytes = shape.node_count * 2 * size_of::<u32>();
    let emit_bytes = shape.bytes_including_emits - shape.bytes_excluding_emits;

    let report = AcReport {
        node_bytes: shape.bytes_excluding_emits,
        edge_count: shape.edge_count,
        theoretical_bytes: shape.edge_count + shape.node_count * size_of::<u32>(),
        full_bytes: shape.bytes_excluding_emits + peripheral_bytes + emit_bytes,
        no_emits_bytes: shape.bytes_excluding_emits + peripheral_bytes,
        patterns_inserted: ac.pattern_count(),
        length_threshold: scenario.length_threshold,
        runtime_ms,
    };
    info!(
        nodes = shape.node_count,
        edges = shape.edge_count,
        patterns = report.patterns_inserted,
        runtime_ms,
        "ran aho-corasick scenario"
    );
    report
}

/// Scan each query payload with the automaton; every emit scores one hit
/// per SID of the matched pattern.
pub fn search_ac(
    ac: &AhoCorasick,
    patterns: &PatternSet,
    queries: &[crate::input::Query],
) -> Vec<SearchReport> {
    let sid_map = patterns.sid_map();
    let full_list_bytes: usize = sid_map.values().map(|s| s.len() * size_of::<u32>()).sum();
    let iblt = iblt_projection(sid_map.len(), full_list_bytes);

    let shape = ac.traverse();
    let peripheral_bytes = shape.node_count * 2 * size_of::<u32>();
    let size_bytes = shape.bytes_including_emits + peripheral_bytes;

    queries
        .iter()
        .map(|query| {
            let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();
            for emit in ac.scan(&query.bytes) {
                if let Some(sids) = sid_map.get(&emit.bytes) {
                    for &sid in sids {
                        *histogram.entry(sid).or_insert(0) += 1;
                    }
                }
            }
            SearchReport {
                search_key: query.search_key.clone(),
                expected_sids: query.sids.clone(),
                sid_hit_histogram: histogram,
                size_bytes,
                full_list_bytes,
                iblt,
            }
        })
        .collect()
}

// ============================================================================
// IBLT projection
// ============================================================================

/// Cell sizing for the informational projections: count, key sum, and
/// check sum of one u32 each, plus the average SID-list payload.
fn iblt_projection(num_keys: usize, total_sid_bytes: usize) -> IbltProjection {
    if num_keys == 0 {
        return IbltProjection {
            optimal: 0,
            recover_100: 0,
            recover_99: 0,
            recover_95: 0,
        };
    }
    let cell_bytes = 3 * size_of::<u32>() + total_sid_bytes.div_ceil(num_keys);
    let cells = |factor: f64| ((num_keys as f64 * factor).ceil() as usize) * cell_bytes;
    IbltProjection {
        optimal: cells(1.22),
        recover_100: cells(2.0),
        recover_99: cells(1.35),
        recover_95: cells(1.30),
    }
}
