//! Pipeline errors.
//!
//! Every variant aborts the whole request. Per-cell problems (unparseable
//! results, unmatched determinands) never reach this type; they degrade to
//! `Verbatim`/`Empty` cells instead.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single generation request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No lab workbook was supplied.
    #[error("no lab file uploaded")]
    MissingInput,

    /// The sample column selector was zero.
    #[error("sample column number must be 1 or greater")]
    InvalidColumn,

    /// The template workbook does not exist at the configured path.
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The template does not have the shape the layout expects.
    #[error("template layout mismatch: {0}")]
    TemplateLayout(String),

    /// The lab workbook has fewer sheets than the variant reads from.
    #[error("sheet {index} not found (workbook has {available} sheet(s))")]
    SheetNotFound { index: usize, available: usize },

    /// The lab sheet is smaller than the variant's fixed offsets.
    #[error("sheet too small: {0}")]
    SheetShape(String),

    /// A split source row needed by the combine step is absent.
    #[error("missing source row matching '{0}'")]
    MissingSourceRow(String),

    /// A determinand set failed validation.
    #[error("invalid determinand set: {0}")]
    Determinands(String),

    #[error("invalid determinand pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to parse determinand set: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("failed to process template workbook: {0}")]
    Template(#[from] umya_spreadsheet::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
