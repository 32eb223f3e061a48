//! Unit adjustments applied after mapping (DETS reports).
//!
//! - Combine: sum split source rows (xylene isomer groups) into one row.
//! - Rescale: divide a block of readings (µg/kg to mg/kg).

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::determinands::{Adjustments, CombineRule, RescaleRule};
use crate::error::{PipelineError, Result};
use crate::excel::CellValue;
use crate::mapper::first_match;
use crate::types::{MatchedRow, RawRow, Reading, ResultValue, LESS_THAN};

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parses a number after dropping everything but digits, sign, decimal point
/// and exponent markers.
pub fn parse_loose(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Reads a raw source cell as a reading.
fn source_reading(cell: &CellValue) -> Option<Reading> {
    if let Some(n) = cell.as_number() {
        return Decimal::from_str(&n.to_string())
            .ok()
            .map(|d| Reading::new(d, false));
    }
    let text = cell.as_text()?;
    parse_loose(text).map(|d| Reading::new(d, text.trim_start().starts_with(LESS_THAN)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Combine
// ─────────────────────────────────────────────────────────────────────────────

/// Sums the rule's source rows, looked up in the extracted lab rows.
///
/// A missing source row is an error. A source without a number yields
/// `None`, leaving the target row as mapped.
pub fn combine(rule: &CombineRule, rows: &[RawRow]) -> Result<Option<Reading>> {
    let mut total = Decimal::ZERO;
    let mut below_limit = false;

    for matcher in &rule.sources {
        let row = first_match(matcher, rows)
            .ok_or_else(|| PipelineError::MissingSourceRow(matcher.pattern().to_string()))?;
        let Some(reading) = source_reading(&row.cell) else {
            warn!(label = row.label(), cell = ?row.cell, "combine source is not a number");
            return Ok(None);
        };
        total += reading.value;
        below_limit |= reading.below_limit;
    }

    Ok(Some(Reading::new(total.normalize(), below_limit)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Rescale
// ─────────────────────────────────────────────────────────────────────────────

/// Divides one reading, keeping its marker.
pub fn rescale_reading(reading: &Reading, divisor: Decimal) -> Reading {
    Reading::new((reading.value / divisor).normalize(), reading.below_limit)
}

/// Divides every reading in the rule's row block.
pub fn rescale(rule: &RescaleRule, mapped: &mut [MatchedRow]) {
    let last = rule.last_row.min(mapped.len().saturating_sub(1));
    for row in mapped.iter_mut().take(last + 1).skip(rule.first_row) {
        if let ResultValue::Parsed(reading) = &row.result {
            row.result = ResultValue::Parsed(rescale_reading(reading, rule.divisor));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Apply
// ─────────────────────────────────────────────────────────────────────────────

/// Runs combine, then rescale, on the mapped rows.
pub fn apply(adjustments: &Adjustments, rows: &[RawRow], mapped: &mut [MatchedRow]) -> Result<()> {
    if let Some(rule) = &adjustments.combine {
        if let Some(reading) = combine(rule, rows)? {
            debug!(row = rule.row, value = %reading, "combined split rows");
            if let Some(target) = mapped.get_mut(rule.row) {
                target.result = ResultValue::Parsed(reading);
            }
        }
    }
    if let Some(rule) = &adjustments.rescale {
        rescale(rule, mapped);
        debug!(
            first = rule.first_row,
            last = rule.last_row,
            divisor = %rule.divisor,
            "rescaled rows"
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinands::DeterminandSet;
    use crate::mapper::map_rows;

    fn row(label: &str, value: &str) -> RawRow {
        RawRow::new(
            Some(label.to_string()),
            CellValue::Text(value.to_string()),
            true,
        )
    }

    fn dets() -> DeterminandSet {
        DeterminandSet::dets().unwrap()
    }

    #[test]
    fn parse_loose_strips_units_and_markers() {
        assert_eq!(parse_loose("<0.5"), Some(Decimal::from_str("0.5").unwrap()));
        assert_eq!(parse_loose("0.3 mg/kg"), Some(Decimal::from_str("0.3").unwrap()));
        assert_eq!(parse_loose("1.5e-3"), Some(Decimal::from_str("0.0015").unwrap()));
        assert_eq!(parse_loose("n.d"), None);
        assert_eq!(parse_loose(""), None);
    }

    #[test]
    fn combine_sums_and_keeps_marker() {
        let set = dets();
        let rule = set.adjustments.combine.as_ref().unwrap();
        let rows = vec![row("p & m-Xylene", "<0.5"), row("o-Xylene", "0.3")];
        let reading = combine(rule, &rows).unwrap().unwrap();
        assert_eq!(reading.to_string(), "<0.8");
    }

    #[test]
    fn combine_without_marker() {
        let set = dets();
        let rule = set.adjustments.combine.as_ref().unwrap();
        let rows = vec![row("o-Xylene", "1.25"), row("p & m-Xylene", "2")];
        assert_eq!(combine(rule, &rows).unwrap().unwrap().to_string(), "3.25");
    }

    #[test]
    fn combine_reads_number_cells() {
        let set = dets();
        let rule = set.adjustments.combine.as_ref().unwrap();
        let rows = vec![
            RawRow::new(Some("p & m-Xylene".into()), CellValue::Number(4.0), true),
            RawRow::new(Some("o-Xylene".into()), CellValue::Number(1.5), true),
        ];
        assert_eq!(combine(rule, &rows).unwrap().unwrap().to_string(), "5.5");
    }

    #[test]
    fn combine_missing_source_row_fails() {
        let set = dets();
        let rule = set.adjustments.combine.as_ref().unwrap();
        let rows = vec![row("p & m-Xylene", "<0.5")];
        let err = combine(rule, &rows).unwrap_err();
        assert!(matches!(err, PipelineError::MissingSourceRow(p) if p.contains("o-Xylene")));
    }

    #[test]
    fn combine_unparseable_source_is_skipped() {
        let set = dets();
        let rule = set.adjustments.combine.as_ref().unwrap();
        let rows = vec![row("p & m-Xylene", "n/a"), row("o-Xylene", "0.3")];
        assert!(combine(rule, &rows).unwrap().is_none());
    }

    #[test]
    fn rescale_divides_and_keeps_marker() {
        let divisor = Decimal::from(1000);
        let plain = Reading::parse("250", true).unwrap();
        assert_eq!(rescale_reading(&plain, divisor).to_string(), "0.25");
        let marked = Reading::parse("<10", true).unwrap();
        assert_eq!(rescale_reading(&marked, divisor).to_string(), "<0.01");
    }

    #[test]
    fn rescale_touches_only_the_block() {
        let rule = RescaleRule {
            first_row: 1,
            last_row: 2,
            divisor: Decimal::from(1000),
        };
        let parsed = |s: &str| MatchedRow {
            key: "k".into(),
            source: None,
            result: ResultValue::Parsed(Reading::parse(s, true).unwrap()),
        };
        let mut mapped = vec![
            parsed("250"),
            parsed("250"),
            MatchedRow {
                key: "k".into(),
                source: None,
                result: ResultValue::Verbatim("n.d.".into()),
            },
            parsed("250"),
        ];
        rescale(&rule, &mut mapped);
        let out: Vec<String> = mapped.iter().map(|m| m.result.to_string()).collect();
        assert_eq!(out, vec!["250", "0.25", "n.d.", "250"]);
    }

    #[test]
    fn apply_combines_then_rescales() {
        let set = dets();
        let rows = vec![
            row("Benzene", "250"),
            row("p & m-Xylene", "<0.5"),
            row("o-Xylene", "0.3"),
            row("Lead", "45"),
        ];
        let mut mapped = map_rows(&set, &rows);
        apply(&set.adjustments, &rows, &mut mapped).unwrap();
        assert_eq!(mapped[29].result.to_string(), "0.25");
        assert_eq!(mapped[32].result.to_string(), "<0.0008");
        assert_eq!(mapped[12].result.to_string(), "45");
    }

    #[test]
    fn apply_without_rules_is_noop() {
        let set = DeterminandSet::standard().unwrap();
        let rows = vec![row("Benzene", "250")];
        let mut mapped = map_rows(&set, &rows);
        let before = mapped.clone();
        apply(&set.adjustments, &rows, &mut mapped).unwrap();
        assert_eq!(mapped, before);
    }
}
