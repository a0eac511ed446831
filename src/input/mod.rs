//! Input record parsing — pattern files and query files.
//!
//! Pattern files carry one JSON record per line; query files are a single
//! JSON array. Parsing works on strings only: the harness performs no I/O,
//! so callers read files however they like and hand the text over.
//!
//! A malformed record fails that record, not the load: failures are
//! collected per line and returned alongside the successfully parsed set.

use serde::Deserialize;
use tracing::warn;

use crate::model::{decode_hex, decode_spaced_hex, Pattern, PatternSet, SidSet};
use crate::{Error, Result};

/// A failed pattern record, reported per line (1-based).
#[derive(Debug)]
pub struct RecordError {
    pub line: usize,
    pub error: Error,
}

/// A search query: the payload bytes to scan and the SIDs the caller
/// expects the scan to hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub sids: SidSet,
    pub bytes: Vec<u8>,
    /// The payload rendered back as a `0x…` literal, used as the report key.
    pub search_key: String,
}

#[derive(Deserialize)]
struct RawRecord {
    /// One `0xNN` literal per pattern byte; concatenated in order.
    exact_match_hex: Vec<String>,
    /// SIDs, possibly repeated; deduplicated on load.
    rules: Vec<u32>,
}

#[derive(Deserialize)]
struct RawQuery {
    sids: Vec<u32>,
    /// Whitespace-separated two-digit hex bytes, e.g. `"FF 00 3A"`.
    hex_string_example: String,
}

/// Parse one pattern record line.
pub fn parse_pattern_record(line: &str) -> Result<Pattern> {
    let raw: RawRecord = serde_json::from_str(line).map_err(|e| Error::RecordParse {
        line: 0,
        message: e.to_string(),
    })?;

    let mut bytes = Vec::with_capacity(raw.exact_match_hex.len());
    for literal in &raw.exact_match_hex {
        let decoded = decode_hex(literal)?;
        bytes.extend_from_slice(&decoded);
    }
    if bytes.is_empty() {
        return Err(Error::RecordParse {
            line: 0,
            message: "record has an empty pattern".into(),
        });
    }

    let sids: SidSet = raw.rules.iter().copied().collect();
    if sids.is_empty() {
        return Err(Error::RecordParse {
            line: 0,
            message: "record names no rules".into(),
        });
    }

    Ok(Pattern::new(bytes, sids))
}

/// Load a line-oriented pattern file. Blank lines are skipped; each failed
/// record is reported with its line number and the load continues.
pub fn load_patterns(input: &str) -> (PatternSet, Vec<RecordError>) {
    let mut patterns = PatternSet::new();
    let mut errors = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_pattern_record(line) {
            Ok(pattern) => patterns.insert(pattern),
            Err(error) => {
                let error = match error {
                    Error::RecordParse { message, .. } => Error::RecordParse {
                        line: line_no,
                        message,
                    },
                    other => other,
                };
                warn!(line = line_no, %error, "skipping malformed pattern record");
                errors.push(RecordError { line: line_no, error });
            }
        }
    }
    (patterns, errors)
}

/// Parse a query file: a JSON array of `{ sids, hex_string_example }`.
pub fn parse_queries(input: &str) -> Result<Vec<Query>> {
    let raw: Vec<RawQuery> = serde_json::from_str(input).map_err(|e| Error::RecordParse {
        line: 0,
        message: e.to_string(),
    })?;

    let mut queries = Vec::with_capacity(raw.len());
    for q in raw {
        let bytes = decode_spaced_hex(&q.hex_string_example)?;
        let search_key = render_key(&bytes);
        queries.push(Query {
            sids: q.sids.into_iter().collect(),
            bytes,
            search_key,
        });
    }
    Ok(queries)
}

fn render_key(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
