//! Template writing: fill the results column of the loaded template.
//!
//! Only the result block on the target sheet changes, one row per canonical
//! entry. Everything else in the workbook is written back as it was read.

use rust_decimal::prelude::ToPrimitive;
use tracing::debug;
use umya_spreadsheet::Cell;

use crate::error::{PipelineError, Result};
use crate::excel::{cell_ref, Template};
use crate::layout::Layout;
use crate::types::{MatchedRow, Reading, ResultValue};

/// Number format showing exactly `places` fractional digits.
fn fixed_format(places: u32) -> String {
    format!("0.{}", "0".repeat(places as usize))
}

fn write_reading(cell: &mut Cell, reading: &Reading) {
    let number = if reading.below_limit {
        None
    } else {
        reading.value.to_f64()
    };
    match number {
        Some(n) => {
            cell.set_value_number(n);
            if reading.fraction_digits() > 0 {
                cell.get_style_mut()
                    .get_number_format_mut()
                    .set_format_code(fixed_format(reading.fraction_digits()));
            }
        }
        None => {
            cell.set_value_string(reading.to_string());
        }
    }
}

fn write_result(cell: &mut Cell, value: &ResultValue) {
    match value {
        // Clears whatever the template held in the block.
        ResultValue::Empty => {
            cell.set_value_string("");
        }
        ResultValue::Parsed(reading) => write_reading(cell, reading),
        ResultValue::Verbatim(text) => {
            cell.set_value_string(text.as_str());
        }
    }
}

/// Writes `rows` into the template's target sheet and serializes it.
pub fn write_workbook(mut template: Template, layout: &Layout, rows: &[MatchedRow]) -> Result<Vec<u8>> {
    let sheet = template
        .target_mut()
        .ok_or_else(|| PipelineError::TemplateLayout("template has no sheets".into()))?;
    let first_row = layout.output_first_row as usize;
    let column = usize::from(layout.output_column);

    for (offset, matched) in rows.iter().enumerate() {
        let address = cell_ref(first_row + offset, column);
        write_result(sheet.get_cell_mut(address.as_str()), &matched.result);
    }
    let sheet_name = sheet.get_name().to_string();

    let bytes = template.to_bytes()?;
    debug!(
        sheet = %sheet_name,
        results = rows.len(),
        bytes = bytes.len(),
        "workbook written"
    );
    Ok(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
