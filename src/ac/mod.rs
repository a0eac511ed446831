//! # Aho-Corasick Keyword Automaton
//!
//! A trie with failure links and emit sets over variable-length byte
//! patterns. Nodes live in an arena and refer to each other by index, so the
//! cyclic failure graph never touches ownership: the arena owns every node,
//! parent→child edges and failure links are both plain indices.
//!
//! The failure graph is materialized lazily on the first scan after an
//! insert, behind a once-cell — one builder at a time, release/acquire on
//! the built flag, lock-free reads afterwards.
//!
//! Case folding is asymmetric: only the scanned text is lowercased (ASCII)
//! when `case_insensitive` is set. Callers wanting full insensitivity must
//! pre-normalize inserted patterns.

pub mod interval;

use std::collections::VecDeque;
use std::mem::size_of;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use interval::{Interval, IntervalTree};

const ROOT: u32 = 0;

// ============================================================================
// Options
// ============================================================================

/// Scan behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcOptions {
    /// Report every occurrence, including overlapping ones.
    pub allow_overlaps: bool,
    /// Drop emits bordered by an ASCII letter on either side.
    pub only_whole_words: bool,
    /// ASCII-lowercase the scanned text (never the inserted patterns).
    pub case_insensitive: bool,
}

impl Default for AcOptions {
    fn default() -> Self {
        Self {
            allow_overlaps: true,
            only_whole_words: false,
            case_insensitive: true,
        }
    }
}

// ============================================================================
// Emits and tokens
// ============================================================================

/// A pattern occurrence over zero-based inclusive indices into the scanned
/// text; `end - start + 1` equals the pattern length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emit {
    pub start: usize,
    pub end: usize,
    /// The matched pattern bytes, as inserted.
    pub bytes: Vec<u8>,
    /// Insertion index of the pattern; disambiguates repeated insertions of
    /// identical bytes.
    pub index: u32,
}

impl Interval for Emit {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}

/// One element of a tokenised text: either a match or the non-matching
/// fragment between matches, in text order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'t> {
    Match { fragment: &'t [u8], emit: Emit },
    Fragment(&'t [u8]),
}

impl<'t> Token<'t> {
    pub fn is_match(&self) -> bool {
        matches!(self, Token::Match { .. })
    }

    pub fn fragment(&self) -> &'t [u8] {
        match self {
            Token::Match { fragment, .. } => fragment,
            Token::Fragment(fragment) => fragment,
        }
    }
}

// ============================================================================
// Trie storage
// ============================================================================

/// Arena node. Transitions are sorted by byte for binary search; emits hold
/// keyword ids, which double as insertion indices.
#[derive(Debug, Clone)]
struct TrieNode {
    trans: SmallVec<[(u8, u32); 4]>,
    depth: u32,
    emits: SmallVec<[u32; 1]>,
}

impl TrieNode {
    fn new(depth: u32) -> Self {
        Self {
            trans: SmallVec::new(),
            depth,
            emits: SmallVec::new(),
        }
    }
}

/// Failure links plus the propagated emit set per node. Built once per trie
/// generation; a node's propagated set is its own emits unioned with its
/// failure target's propagated set, which makes scans single-pass.
#[derive(Debug)]
struct FailureGraph {
    fail: Vec<u32>,
    emits: Vec<SmallVec<[u32; 2]>>,
}

/// Shape measurements from a pre-order traversal of the trie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrieShape {
    pub node_count: usize,
    pub edge_count: usize,
    /// Transition storage only: one byte plus one child index per edge.
    pub bytes_excluding_emits: usize,
    /// Transition storage plus, per emit entry, its index and pattern bytes.
    pub bytes_including_emits: usize,
}

// ============================================================================
// Automaton
// ============================================================================

/// Aho-Corasick automaton over variable-length byte patterns.
pub struct AhoCorasick {
    nodes: Vec<TrieNode>,
    keywords: Vec<Vec<u8>>,
    options: AcOptions,
    failure: OnceCell<FailureGraph>,
}

impl AhoCorasick {
    pub fn new(options: AcOptions) -> Self {
        Self {
            nodes: vec![TrieNode::new(0)],
            keywords: Vec::new(),
            options,
            failure: OnceCell::new(),
        }
    }

    pub fn options(&self) -> AcOptions {
        self.options
    }

    /// Number of inserted patterns, counting repeats.
    pub fn pattern_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a pattern. Invalidates any previously computed failure graph;
    /// the next scan rebuilds it. Empty patterns are ignored.
    ///
    /// Re-inserting identical bytes does not change the trie shape, but the
    /// terminal node gains a second emit with a fresh insertion index.
    pub fn insert(&mut self, pattern: &[u8]) {
        if pattern.is_empty() {
            return;
        }
        let mut state = ROOT;
        for &byte in pattern {
            state = match transition(&self.nodes, state, byte) {
                Some(next) => next,
                None => {
                    let child = self.nodes.len() as u32;
                    let depth = self.nodes[state as usize].depth + 1;
                    self.nodes.push(TrieNode::new(depth));
                    let trans = &mut self.nodes[state as usize].trans;
                    let at = trans
                        .binary_search_by_key(&byte, |&(b, _)| b)
                        .unwrap_err();
                    trans.insert(at, (byte, child));
                    child
                }
            };
        }
        let keyword_id = self.keywords.len() as u32;
        self.keywords.push(pattern.to_vec());
        self.nodes[state as usize].emits.push(keyword_id);
        self.failure = OnceCell::new();
    }

    /// Scan `text`, returning every emit the options admit. Builds the
    /// failure graph on the first call after an insert.
    pub fn scan(&self, text: &[u8]) -> Vec<Emit> {
        let graph = self
            .failure
            .get_or_init(|| build_failure_graph(&self.nodes));

        let mut emits = Vec::new();
        let mut state = ROOT;
        for (pos, &raw) in text.iter().enumerate() {
            let byte = if self.options.case_insensitive {
                raw.to_ascii_lowercase()
            } else {
                raw
            };
            state = next_state(&self.nodes, graph, state, byte);
            for &keyword_id in &graph.emits[state as usize] {
                let bytes = &self.keywords[keyword_id as usize];
                emits.push(Emit {
                    start: pos + 1 - bytes.len(),
                    end: pos,
                    bytes: bytes.clone(),
                    index: keyword_id,
                });
            }
        }

        if self.options.only_whole_words {
            remove_partial_words(text, &mut emits);
        }
        if !self.options.allow_overlaps {
            emits = IntervalTree::remove_overlaps(emits);
        }
        emits
    }

    /// Split `text` into matches and the fragments between them, in text
    /// order. Overlapping emits are linearized by keeping the
    /// first-starting, longest emit at each position.
    pub fn tokenise<'t>(&self, text: &'t [u8]) -> Vec<Token<'t>> {
        let mut emits = self.scan(text);
        emits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut tokens = Vec::new();
        let mut cursor = 0usize;
        for emit in emits {
            if emit.start < cursor {
                continue;
            }
            if emit.start > cursor {
                tokens.push(Token::Fragment(&text[cursor..emit.start]));
            }
            let fragment = &text[emit.start..=emit.end];
            cursor = emit.end + 1;
            tokens.push(Token::Match { fragment, emit });
        }
        if cursor < text.len() {
            tokens.push(Token::Fragment(&text[cursor..]));
        }
        tokens
    }

    /// Pre-order traversal measuring the trie's shape.
    pub fn traverse(&self) -> TrieShape {
        let mut shape = TrieShape::default();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            shape.node_count += 1;
            shape.edge_count += node.trans.len();
            let trans_bytes = node.trans.len() * (size_of::<u8>() + size_of::<u32>());
            let emit_bytes: usize = node
                .emits
                .iter()
                .map(|&id| size_of::<u32>() + self.keywords[id as usize].len())
                .sum();
            shape.bytes_excluding_emits += trans_bytes;
            shape.bytes_including_emits += trans_bytes + emit_bytes;
            for &(_, child) in node.trans.iter().rev() {
                stack.push(child);
            }
        }
        shape
    }
}

// ============================================================================
// Internals
// ============================================================================

fn transition(nodes: &[TrieNode], state: u32, byte: u8) -> Option<u32> {
    let trans = &nodes[state as usize].trans;
    trans
        .binary_search_by_key(&byte, |&(b, _)| b)
        .ok()
        .map(|i| trans[i].1)
}

/// Follow transitions, falling back along failure links until one exists or
/// the root absorbs the byte.
fn next_state(nodes: &[TrieNode], graph: &FailureGraph, mut state: u32, byte: u8) -> u32 {
    loop {
        if let Some(next) = transition(nodes, state, byte) {
            return next;
        }
        if state == ROOT {
            return ROOT;
        }
        state = graph.fail[state as usize];
    }
}

/// Breadth-first failure-link construction.
///
/// Depth-1 nodes fail to the root. For a node reached from `parent` via
/// `byte`, the failure link is the deepest ancestor of `parent` along
/// failure links whose child on `byte` exists, or the root. After linking,
/// the target's propagated emit set is unioned into the node's.
fn build_failure_graph(nodes: &[TrieNode]) -> FailureGraph {
    let mut fail = vec![ROOT; nodes.len()];
    let mut emits: Vec<SmallVec<[u32; 2]>> = nodes
        .iter()
        .map(|n| n.emits.iter().copied().collect())
        .collect();

    let mut queue: VecDeque<u32> = nodes[ROOT as usize]
        .trans
        .iter()
        .map(|&(_, child)| child)
        .collect();

    while let Some(id) = queue.pop_front() {
        for &(byte, child) in &nodes[id as usize].trans {
            queue.push_back(child);

            let mut probe = fail[id as usize];
            let link = loop {
                if let Some(next) = transition(nodes, probe, byte) {
                    break next;
                }
                if probe == ROOT {
                    break ROOT;
                }
                probe = fail[probe as usize];
            };
            fail[child as usize] = link;

            // BFS order guarantees the link's set is already complete.
            let inherited: SmallVec<[u32; 2]> = emits[link as usize].clone();
            emits[child as usize].extend(inherited);
        }
    }

    FailureGraph { fail, emits }
}

/// Whole-word filter: an emit survives only when neither adjacent text byte
/// is an ASCII letter.
fn remove_partial_words(text: &[u8], emits: &mut Vec<Emit>) {
    emits.retain(|e| {
        let left_ok = e.start == 0 || !text[e.start - 1].is_ascii_alphabetic();
        let right_ok = e.end + 1 == text.len() || !text[e.end + 1].is_ascii_alphabetic();
        left_ok && right_ok
    });
}
