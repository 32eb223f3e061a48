//! TUI application state - the form, the last result, and its actions.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;

use super::state::{Field, InputMode};
use crate::layout::Variant;
use crate::pipeline::{GenerationRequest, GenerationResult, Report, Stage, Upload};

/// Duration to show status messages.
const STATUS_MESSAGE_DURATION: Duration = Duration::from_secs(4);

/// Form defaults and fixed paths, from the command line.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub lab: Option<PathBuf>,
    pub column: usize,
    pub variant: Variant,
    pub template: Option<PathBuf>,
    pub determinands: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Main application state for the TUI.
pub struct App {
    /// Lab workbook path as typed.
    pub(super) lab_path: String,
    /// Sample column as typed.
    pub(super) column: String,
    pub(super) variant: Variant,
    pub(super) focus: Field,
    pub(super) input_mode: InputMode,
    /// Stage of the current or last request.
    pub(super) stage: Stage,
    /// Last successful result.
    pub(super) report: Option<Report>,
    /// Message of the last failed request.
    pub(super) failure: Option<String>,
    /// Selection in the results table.
    pub(super) list_state: ListState,
    template: Option<PathBuf>,
    determinands: Option<PathBuf>,
    output_dir: PathBuf,
    /// Status message to display (with expiration time).
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            lab_path: settings
                .lab
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            column: settings.column.max(1).to_string(),
            variant: settings.variant,
            focus: Field::default(),
            input_mode: InputMode::default(),
            stage: Stage::Idle,
            report: None,
            failure: None,
            list_state: ListState::default(),
            template: settings.template,
            determinands: settings.determinands,
            output_dir: settings.output_dir,
            status_message: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Form editing
    // ─────────────────────────────────────────────────────────────────────────

    pub const fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub const fn prev_field(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Starts editing the focused field; the variant toggles instead.
    pub fn edit_focused(&mut self) {
        if self.focus.is_text() {
            self.input_mode = InputMode::Editing;
        } else {
            self.toggle_variant();
        }
    }

    pub const fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn toggle_variant(&mut self) {
        self.variant = self.variant.toggle();
        self.set_status(format!("Variant: {}", self.variant.label()));
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Lab => Some(&mut self.lab_path),
            Field::Column => Some(&mut self.column),
            Field::Variant => None,
        }
    }

    pub fn input_push(&mut self, c: char) {
        let column = self.focus == Field::Column;
        if column && !c.is_ascii_digit() {
            return;
        }
        if let Some(text) = self.focused_text() {
            text.push(c);
        }
    }

    pub fn input_pop(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Builds a request from the form.
    ///
    /// An empty lab path gives a request without an upload, which the
    /// pipeline rejects.
    pub fn request(&self) -> Result<GenerationRequest, String> {
        let column_selector = self
            .column
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("Sample column '{}' is not a number", self.column))?;

        let path = self.lab_path.trim();
        let upload = if path.is_empty() {
            None
        } else {
            Some(Upload::from_path(Path::new(path)).map_err(|e| format!("{path}: {e}"))?)
        };

        let mut request = GenerationRequest::new(upload, column_selector, self.variant);
        request.template.clone_from(&self.template);
        request.determinands.clone_from(&self.determinands);
        Ok(request)
    }

    /// Clears the previous result before a new request.
    pub fn begin(&mut self) {
        self.stage = Stage::Idle;
        self.report = None;
        self.failure = None;
        self.list_state.select(None);
    }

    pub fn finish(&mut self, result: GenerationResult) {
        match result {
            GenerationResult::Ready(report) => {
                self.stage = Stage::Ready;
                self.set_status(format!(
                    "{} ready: {}/{} determinands matched (s to save)",
                    report.artifact.file_name,
                    report.table.matched_count(),
                    report.table.determinand_count()
                ));
                self.report = Some(*report);
                self.list_state.select(Some(0));
            }
            GenerationResult::Failed(message) => {
                self.stage = Stage::Failed;
                self.failure = Some(message);
            }
            GenerationResult::Rejected(message) => {
                self.stage = Stage::Idle;
                self.set_status(message);
            }
        }
    }

    /// Saves the last artifact into the output directory.
    pub fn save(&mut self) -> Result<PathBuf, String> {
        let Some(report) = &self.report else {
            return Err("Nothing to save yet, press Enter to generate".to_string());
        };
        let path = report
            .artifact
            .save(&self.output_dir)
            .map_err(|e| format!("Failed to save: {e}"))?;
        self.set_status(format!("Saved to {}", path.display()));
        Ok(path)
    }

    pub const fn can_save(&self) -> bool {
        self.report.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status and navigation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().and_then(|(msg, created)| {
            if created.elapsed() < STATUS_MESSAGE_DURATION {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    fn row_count(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.table.rows.len())
    }

    pub fn select_previous(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| i.saturating_sub(1));
        self.list_state.select(Some(i));
    }

    pub fn select_next(&mut self) {
        let count = self.row_count();
        if count == 0 {
            return;
        }
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| (i + 1).min(count - 1));
        self.list_state.select(Some(i));
    }
}
