//! TUI state types - form fields, input mode, and result colors.

use ratatui::style::Color;

use crate::pipeline::Stage;
use crate::types::ResultValue;

// ─────────────────────────────────────────────────────────────────────────────
// Input Mode
// ─────────────────────────────────────────────────────────────────────────────

/// The current input mode for the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Navigation and actions.
    #[default]
    Normal,
    /// Typing into the focused text field.
    Editing,
}

// ─────────────────────────────────────────────────────────────────────────────
// Form Fields
// ─────────────────────────────────────────────────────────────────────────────

/// The focused form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    /// Path of the lab workbook.
    #[default]
    Lab,
    /// 1-based sample column.
    Column,
    /// Standard or DETS.
    Variant,
}

impl Field {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lab => "Lab file",
            Self::Column => "Sample column",
            Self::Variant => "Variant",
        }
    }

    /// Whether the field takes typed text.
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Lab | Self::Column)
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Lab => Self::Column,
            Self::Column => Self::Variant,
            Self::Variant => Self::Lab,
        }
    }

    pub const fn prev(self) -> Self {
        match self {
            Self::Lab => Self::Variant,
            Self::Column => Self::Lab,
            Self::Variant => Self::Column,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

/// Color for a result cell in the table.
pub fn result_color(value: &ResultValue) -> Color {
    match value.as_reading() {
        Some(r) if r.below_limit => Color::Cyan,
        Some(_) => Color::Green,
        None if value.is_empty() => Color::DarkGray,
        None => Color::Yellow,
    }
}

pub const fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Ready => Color::Green,
        Stage::Failed => Color::Red,
        s if s.is_busy() => Color::Yellow,
        _ => Color::DarkGray,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
