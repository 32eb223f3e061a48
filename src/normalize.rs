//! Decimal rounding of lab results.
//!
//! A reading written with 4 or more fractional digits is rounded to 2 places
//! and keeps exactly 2 places. Rounding works on the nearest binary double,
//! half to even, so `2.675` (stored just below the midpoint) becomes `2.67`.
//! Everything else passes through untouched, so normalizing twice is the same
//! as normalizing once.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{RawRow, Reading, ResultValue};

/// Fractional digits at which a reading gets rounded.
pub const ROUND_FROM_DIGITS: u32 = 4;
/// Places kept after rounding.
pub const ROUNDED_PLACES: u32 = 2;

/// Rounds one reading if it is written too precisely.
pub fn normalize_reading(reading: &Reading) -> Reading {
    if reading.fraction_digits() < ROUND_FROM_DIGITS {
        return reading.clone();
    }
    let mut value = round_binary(reading.value);
    value.rescale(ROUNDED_PLACES);
    Reading::new(value, reading.below_limit)
}

/// Rounds the double nearest to `value`, digit for digit as float rounding
/// sees it.
fn round_binary(value: Decimal) -> Decimal {
    let exact = value
        .to_string()
        .parse::<f64>()
        .ok()
        .and_then(Decimal::from_f64_retain)
        .unwrap_or(value);
    exact.round_dp_with_strategy(ROUNDED_PLACES, RoundingStrategy::MidpointNearestEven)
}

pub fn normalize_value(value: &ResultValue) -> ResultValue {
    match value {
        ResultValue::Parsed(r) => ResultValue::Parsed(normalize_reading(r)),
        other => other.clone(),
    }
}

/// Normalizes every extracted row's result; labels and raw cells are kept.
pub fn normalize_rows(rows: &[RawRow]) -> Vec<RawRow> {
    rows.iter()
        .map(|row| RawRow {
            result: normalize_value(&row.result),
            ..row.clone()
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;

    fn norm(text: &str, marker: bool) -> String {
        let cell = CellValue::Text(text.to_string());
        normalize_value(&ResultValue::from_cell(&cell, marker)).to_string()
    }

    #[test]
    fn short_fractions_pass_through() {
        assert_eq!(norm("12", false), "12");
        assert_eq!(norm("0.5", false), "0.5");
        assert_eq!(norm("0.50", false), "0.50");
        assert_eq!(norm("1.234", false), "1.234");
    }

    #[test]
    fn long_fractions_round_to_two_places() {
        assert_eq!(norm("1.23456", false), "1.23");
        assert_eq!(norm("0.0049", false), "0.00");
        assert_eq!(norm("2.9999", false), "3.00");
        assert_eq!(norm("-4.56789", false), "-4.57");
    }

    #[test]
    fn midpoints_round_on_the_stored_double() {
        // 0.125 is exact in binary, so the tie goes to even.
        assert_eq!(norm("0.1250", false), "0.12");
        // 0.135 and 2.675 are stored just above and just below the midpoint.
        assert_eq!(norm("0.1350", false), "0.14");
        assert_eq!(norm("2.6750", false), "2.67");
        assert_eq!(norm("1.0150", false), "1.01");
    }

    #[test]
    fn marker_kept_when_accepted() {
        assert_eq!(norm("<0.12345", true), "<0.12");
        assert_eq!(norm("<0.12345", false), "<0.12345");
    }

    #[test]
    fn non_numeric_and_empty_pass_through() {
        assert_eq!(norm("n.d.", false), "n.d.");
        assert_eq!(normalize_value(&ResultValue::Empty), ResultValue::Empty);
    }

    #[test]
    fn number_cells_round_too() {
        let value = ResultValue::from_cell(&CellValue::Number(0.123_456), false);
        assert_eq!(normalize_value(&value).to_string(), "0.12");
    }

    #[test]
    fn normalizing_is_idempotent() {
        for text in ["1.23456", "0.5", "<0.98765", "n.d.", "100", "3.14159265"] {
            let once = normalize_value(&ResultValue::from_cell(
                &CellValue::Text(text.into()),
                true,
            ));
            assert_eq!(normalize_value(&once), once, "{text}");
        }
    }

    #[test]
    fn rows_keep_labels_and_raw_cells() {
        let rows = vec![RawRow::new(
            Some("Lead".into()),
            CellValue::Text("1.23456".into()),
            false,
        )];
        let normalized = normalize_rows(&rows);
        assert_eq!(normalized[0].label(), "Lead");
        assert_eq!(normalized[0].cell, CellValue::Text("1.23456".into()));
        assert_eq!(normalized[0].result.to_string(), "1.23");
    }
}
