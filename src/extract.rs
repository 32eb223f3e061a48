//! Row extraction: slice the determinand labels and one sample's results.

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::excel::Sheet;
use crate::layout::Layout;
use crate::types::RawRow;

/// Column holding the determinand labels.
const LABEL_COLUMN: usize = 0;

/// Resolves the result column for a 1-based sample selector.
///
/// Clamping layouts fall back to the last column; strict ones fail.
pub fn result_column(sheet: &Sheet, layout: &Layout, selector: usize) -> Result<usize> {
    let wanted = layout.column_base + selector;
    let width = sheet.width();
    if wanted < width {
        return Ok(wanted);
    }
    if layout.clamp && width > 0 {
        warn!(wanted, available = width, "sample column past sheet edge, clamping");
        return Ok(width - 1);
    }
    Err(PipelineError::SheetShape(format!(
        "sample column {selector} is column {} but sheet '{}' has {width} column(s)",
        wanted + 1,
        sheet.name
    )))
}

/// Extracts `(label, result)` rows below the layout's header offset.
///
/// A sheet shorter than the offset yields no rows.
pub fn extract_rows(sheet: &Sheet, layout: &Layout, selector: usize) -> Result<Vec<RawRow>> {
    if selector == 0 {
        return Err(PipelineError::InvalidColumn);
    }
    if sheet.width() == 0 {
        debug!(sheet = %sheet.name, "empty sheet");
        return Ok(Vec::new());
    }
    let column = result_column(sheet, layout, selector)?;

    let rows: Vec<RawRow> = (layout.first_sheet_row()..sheet.height())
        .map(|r| {
            let label = sheet.cell(r, LABEL_COLUMN).as_text().map(str::to_string);
            RawRow::new(label, sheet.cell(r, column).clone(), layout.accepts_marker)
        })
        .collect();

    debug!(
        sheet = %sheet.name,
        column,
        rows = rows.len(),
        "extracted lab rows"
    );
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;
    use crate::layout::{DETS, STANDARD};
    use crate::types::ResultValue;

    /// Sheet with `data_rows` rows after the header, `width` columns; labels
    /// are `D<n>`, results are `<n>.<col>` as text.
    fn sheet(data_rows: usize, width: usize) -> Sheet {
        let mut rows = vec![vec![CellValue::Text("header".into()); width]];
        for r in 0..data_rows {
            let mut row = vec![CellValue::Text(format!("D{r}"))];
            for c in 1..width {
                row.push(CellValue::Text(format!("{r}.{c}")));
            }
            rows.push(row);
        }
        Sheet::from_rows("lab", rows)
    }

    #[test]
    fn standard_reads_below_offset() {
        let s = sheet(20, 10);
        let rows = extract_rows(&s, &STANDARD, 1).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].label(), "D13");
        assert!(matches!(rows[0].result, ResultValue::Parsed(_)));
        assert_eq!(rows[0].result.to_string(), "13.6");
    }

    #[test]
    fn dets_reads_below_offset() {
        let s = sheet(20, 10);
        let rows = extract_rows(&s, &DETS, 2).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].label(), "D16");
        assert_eq!(rows[0].result.to_string(), "16.6");
    }

    #[test]
    fn standard_clamps_column() {
        let s = sheet(20, 8);
        let rows = extract_rows(&s, &STANDARD, 9).unwrap();
        assert_eq!(rows[0].result.to_string(), "13.7");
    }

    #[test]
    fn dets_rejects_column_past_edge() {
        let s = sheet(20, 6);
        let err = extract_rows(&s, &DETS, 3).unwrap_err();
        assert!(matches!(err, PipelineError::SheetShape(_)));
    }

    #[test]
    fn short_sheet_yields_no_rows() {
        let s = sheet(5, 10);
        assert!(extract_rows(&s, &STANDARD, 1).unwrap().is_empty());
        assert!(extract_rows(&s, &DETS, 1).unwrap().is_empty());
    }

    #[test]
    fn empty_sheet_yields_no_rows() {
        let s = Sheet::from_rows("blank", Vec::new());
        assert!(extract_rows(&s, &STANDARD, 1).unwrap().is_empty());
    }

    #[test]
    fn zero_selector_is_rejected() {
        let s = sheet(20, 10);
        assert!(matches!(
            extract_rows(&s, &STANDARD, 0),
            Err(PipelineError::InvalidColumn)
        ));
    }

    #[test]
    fn non_text_labels_are_absent() {
        let mut rows = vec![vec![CellValue::Empty; 7]; 14];
        rows.push(vec![
            CellValue::Number(7.0),
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Number(1.5),
        ]);
        let s = Sheet::from_rows("lab", rows);
        let extracted = extract_rows(&s, &STANDARD, 1).unwrap();
        assert_eq!(extracted.len(), 1);
        assert!(extracted[0].label.is_none());
        assert_eq!(extracted[0].result.to_string(), "1.5");
    }
}
