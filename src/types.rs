//! Common types for the HWOL pipeline.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::excel::CellValue;

/// Prefix marking a result below the analytical detection limit.
pub const LESS_THAN: char = '<';

// ─────────────────────────────────────────────────────────────────────────────
// Result cells
// ─────────────────────────────────────────────────────────────────────────────

/// A numeric lab result.
///
/// The decimal keeps the scale it was written with, so `0.50` renders as
/// `0.50` and reports two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub value: Decimal,
    /// Carries the `<` detection-limit marker.
    pub below_limit: bool,
}

impl Reading {
    pub const fn new(value: Decimal, below_limit: bool) -> Self {
        Self { value, below_limit }
    }

    /// Parses a textual result.
    ///
    /// With `allow_marker` a leading `<` is accepted and only the remainder is
    /// parsed; without it a marked value is not a number.
    pub fn parse(text: &str, allow_marker: bool) -> Option<Self> {
        let trimmed = text.trim();
        let (below_limit, digits) = match trimmed.strip_prefix(LESS_THAN) {
            Some(rest) if allow_marker => (true, rest.trim_start()),
            Some(_) => return None,
            None => (false, trimmed),
        };
        Decimal::from_str(digits)
            .ok()
            .map(|value| Self::new(value, below_limit))
    }

    /// Number of digits after the decimal point as written.
    pub const fn fraction_digits(&self) -> u32 {
        self.value.scale()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.below_limit {
            write!(f, "{LESS_THAN}{}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// A result cell after classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultValue {
    /// Blank cell, or no match.
    #[default]
    Empty,
    /// A number, possibly below the detection limit.
    Parsed(Reading),
    /// Anything that is not a number; written back unchanged.
    Verbatim(String),
}

impl ResultValue {
    /// Classifies a raw sheet cell.
    pub fn from_cell(cell: &CellValue, allow_marker: bool) -> Self {
        match cell {
            CellValue::Empty | CellValue::Error(_) => Self::Empty,
            CellValue::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .map_or(Self::Verbatim(text), |d| Self::Parsed(Reading::new(d, false)))
            }
            CellValue::Text(s) if s.trim().is_empty() => Self::Empty,
            CellValue::Text(s) => Reading::parse(s, allow_marker)
                .map_or_else(|| Self::Verbatim(s.clone()), Self::Parsed),
            CellValue::Bool(b) => Self::Verbatim(b.to_string().to_uppercase()),
        }
    }

    pub const fn as_reading(&self) -> Option<&Reading> {
        match self {
            Self::Parsed(r) => Some(r),
            _ => None,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Parsed(r) => write!(f, "{r}"),
            Self::Verbatim(s) => f.write_str(s),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

/// One extracted lab row: determinand label and the selected sample's result.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Label text; `None` when the label cell was not text.
    pub label: Option<String>,
    /// The result cell exactly as read.
    pub cell: CellValue,
    /// Classified result.
    pub result: ResultValue,
}

impl RawRow {
    pub fn new(label: Option<String>, cell: CellValue, allow_marker: bool) -> Self {
        let result = ResultValue::from_cell(&cell, allow_marker);
        Self {
            label,
            cell,
            result,
        }
    }

    /// Label text, empty for non-text labels.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

/// One canonical output row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchedRow {
    /// Canonical key, empty for placeholder positions.
    pub key: String,
    /// Label of the source row that matched, if any.
    pub source: Option<String>,
    pub result: ResultValue,
}

impl MatchedRow {
    pub const fn placeholder() -> Self {
        Self {
            key: String::new(),
            source: None,
            result: ResultValue::Empty,
        }
    }

    pub const fn is_placeholder(&self) -> bool {
        self.key.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
