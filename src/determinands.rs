//! Canonical determinand sets.
//!
//! A set is an ordered list of template rows, each either a blank placeholder
//! or a `(key, pattern)` pair. Sets are versioned YAML files; the two shipped
//! sets are embedded in the binary and a custom one can be loaded from disk.

use std::path::Path;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::layout::Variant;

const STANDARD_YAML: &str = include_str!("../determinands/standard.yaml");
const DETS_YAML: &str = include_str!("../determinands/dets.yaml");

// ─────────────────────────────────────────────────────────────────────────────
// File format
// ─────────────────────────────────────────────────────────────────────────────

/// How patterns are compared against lab labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-sensitive substring.
    Literal,
    /// Regular expression search.
    Regex,
}

#[derive(Debug, Deserialize)]
struct SetFile {
    version: u32,
    #[serde(rename = "match")]
    match_mode: MatchMode,
    length: usize,
    determinands: Vec<Option<EntryFile>>,
    #[serde(default)]
    adjustments: AdjustmentsFile,
}

#[derive(Debug, Deserialize)]
struct EntryFile {
    key: String,
    pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjustmentsFile {
    combine: Option<CombineFile>,
    rescale: Option<RescaleFile>,
}

#[derive(Debug, Deserialize)]
struct CombineFile {
    row: usize,
    sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RescaleFile {
    first_row: usize,
    last_row: usize,
    divisor: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiled set
// ─────────────────────────────────────────────────────────────────────────────

/// A compiled label pattern.
#[derive(Debug, Clone)]
pub enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    fn compile(mode: MatchMode, pattern: &str) -> Result<Self> {
        Ok(match mode {
            MatchMode::Literal => Self::Literal(pattern.to_string()),
            MatchMode::Regex => Self::Regex(Regex::new(pattern)?),
        })
    }

    pub fn is_match(&self, label: &str) -> bool {
        match self {
            Self::Literal(p) => label.contains(p.as_str()),
            Self::Regex(re) => re.is_match(label),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            Self::Literal(p) => p,
            Self::Regex(re) => re.as_str(),
        }
    }
}

/// One canonical, non-placeholder row.
#[derive(Debug, Clone)]
pub struct Determinand {
    pub key: String,
    /// `None` for rows filled by an adjustment.
    pub matcher: Option<Matcher>,
}

/// Sum split source rows into one output row.
#[derive(Debug, Clone)]
pub struct CombineRule {
    pub row: usize,
    pub sources: Vec<Matcher>,
}

/// Divide every reading in `first_row..=last_row` by `divisor`.
#[derive(Debug, Clone)]
pub struct RescaleRule {
    pub first_row: usize,
    pub last_row: usize,
    pub divisor: Decimal,
}

/// Post-mapping unit adjustments.
#[derive(Debug, Clone, Default)]
pub struct Adjustments {
    pub combine: Option<CombineRule>,
    pub rescale: Option<RescaleRule>,
}

impl Adjustments {
    pub const fn is_empty(&self) -> bool {
        self.combine.is_none() && self.rescale.is_none()
    }
}

/// An ordered, validated determinand set.
#[derive(Debug, Clone)]
pub struct DeterminandSet {
    pub version: u32,
    pub match_mode: MatchMode,
    entries: Vec<Option<Determinand>>,
    pub adjustments: Adjustments,
}

impl DeterminandSet {
    /// The embedded set for the standard lab report.
    pub fn standard() -> Result<Self> {
        Self::from_yaml(STANDARD_YAML)
    }

    /// The embedded set for DETS lab reports.
    pub fn dets() -> Result<Self> {
        Self::from_yaml(DETS_YAML)
    }

    pub fn for_variant(variant: Variant) -> Result<Self> {
        match variant {
            Variant::Standard => Self::standard(),
            Variant::Dets => Self::dets(),
        }
    }

    /// Loads a custom set from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a set.
    ///
    /// The entry list is padded with placeholders up to `length`; a list
    /// longer than `length` is rejected.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: SetFile = serde_yaml_ng::from_str(yaml)?;

        if file.determinands.len() > file.length {
            return Err(PipelineError::Determinands(format!(
                "{} entries exceed declared length {}",
                file.determinands.len(),
                file.length
            )));
        }

        let mut entries = Vec::with_capacity(file.length);
        for entry in file.determinands {
            let compiled = match entry {
                None => None,
                Some(e) if e.key.trim().is_empty() => {
                    return Err(PipelineError::Determinands(
                        "entry with an empty key; use ~ for blank rows".into(),
                    ));
                }
                Some(e) => Some(Determinand {
                    matcher: e
                        .pattern
                        .as_deref()
                        .map(|p| Matcher::compile(file.match_mode, p))
                        .transpose()?,
                    key: e.key,
                }),
            };
            entries.push(compiled);
        }
        entries.resize_with(file.length, || None);

        let adjustments = compile_adjustments(file.adjustments, file.match_mode, file.length)?;

        Ok(Self {
            version: file.version,
            match_mode: file.match_mode,
            entries,
            adjustments,
        })
    }

    /// Number of template rows, placeholders included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Option<Determinand>] {
        &self.entries
    }

    /// Index of the last non-placeholder row.
    pub fn last_labelled(&self) -> Option<usize> {
        self.entries.iter().rposition(Option::is_some)
    }
}

fn compile_adjustments(
    file: AdjustmentsFile,
    mode: MatchMode,
    length: usize,
) -> Result<Adjustments> {
    let check_row = |what: &str, row: usize| {
        if row < length {
            Ok(())
        } else {
            Err(PipelineError::Determinands(format!(
                "{what} row {row} is outside the {length} rows"
            )))
        }
    };

    let combine = match file.combine {
        Some(c) => {
            check_row("combine", c.row)?;
            if c.sources.is_empty() {
                return Err(PipelineError::Determinands(
                    "combine needs at least one source".into(),
                ));
            }
            let sources = c
                .sources
                .iter()
                .map(|p| Matcher::compile(mode, p))
                .collect::<Result<Vec<_>>>()?;
            Some(CombineRule {
                row: c.row,
                sources,
            })
        }
        None => None,
    };

    let rescale = match file.rescale {
        Some(r) => {
            check_row("rescale", r.last_row)?;
            if r.first_row > r.last_row || r.divisor == 0 {
                return Err(PipelineError::Determinands(format!(
                    "bad rescale range {}..={} / {}",
                    r.first_row, r.last_row, r.divisor
                )));
            }
            Some(RescaleRule {
                first_row: r.first_row,
                last_row: r.last_row,
                divisor: Decimal::from(r.divisor),
            })
        }
        None => None,
    };

    Ok(Adjustments { combine, rescale })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
