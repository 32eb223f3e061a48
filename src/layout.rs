//! Fixed sheet and template layouts for each pipeline variant.
//!
//! All offsets are 0-based. Lab sheets have one header row (sheet row 0);
//! data-row offsets count from the row below it.

use clap::ValueEnum;
use tracing::debug;

use crate::determinands::DeterminandSet;
use crate::error::{PipelineError, Result};
use crate::excel::Template;

// ─────────────────────────────────────────────────────────────────────────────
// Variant
// ─────────────────────────────────────────────────────────────────────────────

/// Which lab report format is being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Variant {
    /// Standard OEMA lab report.
    #[default]
    Standard,
    /// DETS lab report (split xylene, µg/kg volatiles).
    Dets,
}

impl Variant {
    pub const fn layout(self) -> &'static Layout {
        match self {
            Self::Standard => &STANDARD,
            Self::Dets => &DETS,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Dets => "DETS",
        }
    }

    pub const fn toggle(self) -> Self {
        match self {
            Self::Standard => Self::Dets,
            Self::Dets => Self::Standard,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Named offsets for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Sheet of the lab workbook holding the results.
    pub sheet_index: usize,
    /// Data rows skipped below the header before the first determinand.
    pub first_data_row: usize,
    /// Result column = `column_base + selector`.
    pub column_base: usize,
    /// Clamp an out-of-range start row or column to the last one available.
    pub clamp: bool,
    /// Accept the `<` marker on numeric results.
    pub accepts_marker: bool,
    /// Template column receiving the results (C).
    pub output_column: u16,
    /// First template row receiving a result (row 3).
    pub output_first_row: u32,
    /// Template path relative to the working directory.
    pub template_path: &'static str,
}

/// Standard OEMA report: third sheet, results from data row 13, sample 1 in G.
pub const STANDARD: Layout = Layout {
    sheet_index: 2,
    first_data_row: 13,
    column_base: 5,
    clamp: true,
    accepts_marker: false,
    output_column: 2,
    output_first_row: 2,
    template_path: "MultiSamplesOEMA.xlsx",
};

/// DETS report: first sheet, results from data row 16, sample 1 in F.
pub const DETS: Layout = Layout {
    sheet_index: 0,
    first_data_row: 16,
    column_base: 4,
    clamp: false,
    accepts_marker: true,
    output_column: 2,
    output_first_row: 2,
    template_path: "DETSMultiSamplesOEMA.xlsx",
};

impl Layout {
    /// Sheet row (header included) of the first determinand.
    pub const fn first_sheet_row(&self) -> usize {
        self.first_data_row + 1
    }

    /// Checks the template can hold the determinand set at this layout.
    ///
    /// Runs before any lab data is read, so a misaligned template fails the
    /// request instead of producing a silently shifted report.
    pub fn validate(&self, template: &Template, set: &DeterminandSet) -> Result<()> {
        if set.is_empty() {
            return Err(PipelineError::Determinands("no determinand rows".into()));
        }
        let target = template
            .target()
            .ok_or_else(|| PipelineError::TemplateLayout("template has no sheets".into()))?;

        let height = target.get_highest_row() as usize;
        if let Some(last) = set.last_labelled() {
            let last_row = self.output_first_row as usize + last;
            if last_row >= height {
                return Err(PipelineError::TemplateLayout(format!(
                    "sheet '{}' ends at row {height}, determinand {} needs row {}",
                    target.get_name(),
                    last + 1,
                    last_row + 1
                )));
            }
        }

        debug!(
            sheet = %target.get_name(),
            rows = height,
            determinands = set.len(),
            "template layout ok"
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
