//! Generation pipeline - one request in, one result out.
//!
//! Runs the stages in order:
//! 1. Validate the request, the template and the determinand set
//! 2. Load the lab sheet from the uploaded workbook
//! 3. Extract label/result rows for the selected sample
//! 4. Normalize numeric results
//! 5. Map rows onto the canonical determinand order
//! 6. Apply unit adjustments (sets that declare them)
//! 7. Write the results into a copy of the template
//!
//! Nothing is kept between requests; the template is read fresh every time.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::adjust;
use crate::determinands::DeterminandSet;
use crate::emit::Artifact;
use crate::error::{PipelineError, Result};
use crate::excel::{read_sheet_at, Template};
use crate::extract::extract_rows;
use crate::layout::Variant;
use crate::mapper::{map_rows, unmatched_keys};
use crate::normalize::normalize_rows;
use crate::types::MatchedRow;
use crate::writer::write_workbook;

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// An uploaded lab workbook.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }
}

/// Everything one generation depends on, apart from the template file.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub upload: Option<Upload>,
    /// 1-based sample column.
    pub column_selector: usize,
    pub variant: Variant,
    /// Overrides the variant's template path.
    pub template: Option<PathBuf>,
    /// Overrides the embedded determinand set.
    pub determinands: Option<PathBuf>,
}

impl GenerationRequest {
    pub const fn new(upload: Option<Upload>, column_selector: usize, variant: Variant) -> Self {
        Self {
            upload,
            column_selector,
            variant,
            template: None,
            determinands: None,
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.template
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.variant.layout().template_path))
    }

    fn determinand_set(&self) -> Result<DeterminandSet> {
        match &self.determinands {
            Some(path) => DeterminandSet::load(path),
            None => DeterminandSet::for_variant(self.variant),
        }
    }

    /// The upload, if one with content was given.
    fn lab(&self) -> Result<&Upload> {
        self.upload
            .as_ref()
            .filter(|u| !u.bytes.is_empty())
            .ok_or(PipelineError::MissingInput)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

/// Where a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Validating,
    Loading,
    Extracting,
    Normalizing,
    Mapping,
    Adjusting,
    Writing,
    Ready,
    Failed,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Validating => "Validating",
            Self::Loading => "Loading",
            Self::Extracting => "Extracting",
            Self::Normalizing => "Normalizing",
            Self::Mapping => "Mapping",
            Self::Adjusting => "Adjusting",
            Self::Writing => "Writing",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle | Self::Ready | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical rows plus the match report.
#[derive(Debug, Clone, Default)]
pub struct MappedTable {
    pub rows: Vec<MatchedRow>,
    /// Keys with a pattern that found no lab row.
    pub unmatched: Vec<String>,
}

impl MappedTable {
    /// Rows filled from a lab row.
    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|r| r.source.is_some()).count()
    }

    /// Determinand rows, placeholders excluded.
    pub fn determinand_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_placeholder()).count()
    }
}

/// A finished workbook with the table it was built from.
#[derive(Debug, Clone)]
pub struct Report {
    pub artifact: Artifact,
    pub table: MappedTable,
}

/// Outcome of one request.
#[derive(Debug, Clone)]
pub enum GenerationResult {
    Ready(Box<Report>),
    Failed(String),
    /// Refused before any stage ran.
    Rejected(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Running
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the whole pipeline and folds errors into the result.
pub fn generate(request: &GenerationRequest, mut on_stage: impl FnMut(Stage)) -> GenerationResult {
    if let Err(e) = request.lab() {
        info!(reason = %e, "request rejected");
        return GenerationResult::Rejected(e.to_string());
    }

    match run(request, &mut on_stage) {
        Ok(report) => {
            on_stage(Stage::Ready);
            info!(
                file = %report.artifact.file_name,
                matched = report.table.matched_count(),
                determinands = report.table.determinand_count(),
                "workbook ready"
            );
            GenerationResult::Ready(Box::new(report))
        }
        Err(e) => {
            on_stage(Stage::Failed);
            error!(error = %e, "generation failed");
            GenerationResult::Failed(e.to_string())
        }
    }
}

/// Runs every stage and returns the artifact.
pub fn run(request: &GenerationRequest, on_stage: &mut impl FnMut(Stage)) -> Result<Report> {
    on_stage(Stage::Validating);
    let upload = request.lab()?;
    if request.column_selector == 0 {
        return Err(PipelineError::InvalidColumn);
    }
    let layout = request.variant.layout();
    let template_path = request.template_path();
    if !template_path.is_file() {
        return Err(PipelineError::TemplateNotFound(template_path));
    }
    let template = Template::open(&template_path)?;
    let set = request.determinand_set()?;
    layout.validate(&template, &set)?;
    debug!(
        template = %template_path.display(),
        variant = request.variant.label(),
        set_version = set.version,
        matching = ?set.match_mode,
        "request valid"
    );

    let table = map_upload(upload, request, &set, on_stage)?;

    on_stage(Stage::Writing);
    let bytes = write_workbook(template, layout, &table.rows)?;
    Ok(Report {
        artifact: Artifact::new(bytes),
        table,
    })
}

/// Runs the stages up to mapping, without a template.
pub fn preview(request: &GenerationRequest, on_stage: &mut impl FnMut(Stage)) -> Result<MappedTable> {
    on_stage(Stage::Validating);
    let upload = request.lab()?;
    if request.column_selector == 0 {
        return Err(PipelineError::InvalidColumn);
    }
    let set = request.determinand_set()?;
    map_upload(upload, request, &set, on_stage)
}

fn map_upload(
    upload: &Upload,
    request: &GenerationRequest,
    set: &DeterminandSet,
    on_stage: &mut impl FnMut(Stage),
) -> Result<MappedTable> {
    let layout = request.variant.layout();

    on_stage(Stage::Loading);
    let sheet = read_sheet_at(&upload.bytes, layout.sheet_index)?;
    debug!(upload = %upload.name, sheet = %sheet.name, rows = sheet.height(), "lab sheet loaded");

    on_stage(Stage::Extracting);
    let extracted = extract_rows(&sheet, layout, request.column_selector)?;

    on_stage(Stage::Normalizing);
    let normalized = normalize_rows(&extracted);

    on_stage(Stage::Mapping);
    let mut rows = map_rows(set, &normalized);
    let unmatched = unmatched_keys(set, &rows)
        .into_iter()
        .map(str::to_string)
        .collect();

    if !set.adjustments.is_empty() {
        on_stage(Stage::Adjusting);
        adjust::apply(&set.adjustments, &extracted, &mut rows)?;
    }

    Ok(MappedTable { rows, unmatched })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
