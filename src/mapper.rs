//! Determinand mapping: left-join the canonical set against lab rows.

use tracing::{debug, warn};

use crate::determinands::{DeterminandSet, Matcher};
use crate::types::{MatchedRow, RawRow};

/// First row, in source order, whose label matches.
pub fn first_match<'a>(matcher: &Matcher, rows: &'a [RawRow]) -> Option<&'a RawRow> {
    rows.iter()
        .find(|row| row.label.as_deref().is_some_and(|l| matcher.is_match(l)))
}

/// Maps lab rows onto the canonical order.
///
/// The output always has one row per canonical entry. Placeholders, rows
/// without a pattern and unmatched determinands carry an empty result.
pub fn map_rows(set: &DeterminandSet, rows: &[RawRow]) -> Vec<MatchedRow> {
    let mapped: Vec<MatchedRow> = set
        .entries()
        .iter()
        .map(|entry| {
            let Some(det) = entry else {
                return MatchedRow::placeholder();
            };
            let hit = det.matcher.as_ref().and_then(|m| first_match(m, rows));
            MatchedRow {
                key: det.key.clone(),
                source: hit.map(|r| r.label().to_string()),
                result: hit.map(|r| r.result.clone()).unwrap_or_default(),
            }
        })
        .collect();

    let unmatched = unmatched_keys(set, &mapped);
    if !unmatched.is_empty() {
        warn!(count = unmatched.len(), keys = ?unmatched, "determinands without a lab row");
    }
    debug!(rows = mapped.len(), "mapped determinands");
    mapped
}

/// Keys of pattern-bearing determinands that found no lab row.
pub fn unmatched_keys<'a>(set: &DeterminandSet, mapped: &'a [MatchedRow]) -> Vec<&'a str> {
    set.entries()
        .iter()
        .zip(mapped)
        .filter(|(entry, row)| {
            entry.as_ref().is_some_and(|d| d.matcher.is_some()) && row.source.is_none()
        })
        .map(|(_, row)| row.key.as_str())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
