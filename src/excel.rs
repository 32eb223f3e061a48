//! Excel reading for lab uploads and templates.
//!
//! Provides:
//! - Load one sheet of an uploaded lab workbook from memory
//! - Load a template workbook for in-place editing
//! - Workbook fixtures for tests

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{PipelineError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Cells
// ─────────────────────────────────────────────────────────────────────────────

/// Cell value from an Excel file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell.
    #[default]
    Empty,
    /// Numeric value.
    Number(f64),
    /// String value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Error value.
    Error(String),
}

impl CellValue {
    /// Returns the numeric value if this is a number.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&Data> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(dt: &Data) -> Self {
        match dt {
            Data::Empty => Self::Empty,
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Bool(b) => Self::Bool(*b),
            Data::Error(e) => Self::Error(format!("{e:?}")),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sheets
// ─────────────────────────────────────────────────────────────────────────────

/// A worksheet as a dense grid anchored at cell A1.
///
/// calamine ranges start at the first used cell; the grid pads leading blank
/// rows and columns so indices match Excel coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
    width: usize,
}

impl Sheet {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            name: name.into(),
            rows,
            width,
        }
    }

    fn from_range(name: &str, range: &Range<Data>) -> Self {
        let Some((row0, col0)) = range.start() else {
            return Self::from_rows(name, Vec::new());
        };
        let (height, width) = range.get_size();
        let total_width = col0 as usize + width;
        let mut rows = vec![vec![CellValue::Empty; total_width]; row0 as usize + height];
        for (r, c, value) in range.used_cells() {
            rows[row0 as usize + r][col0 as usize + c] = CellValue::from(value);
        }
        Self {
            name: name.to_string(),
            rows,
            width: total_width,
        }
    }

    /// Number of rows, header included.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// Cell at 0-based (row, col); out-of-range cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(EMPTY)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Reads the sheet at `index` from an uploaded workbook held in memory.
pub fn read_sheet_at(bytes: &[u8], index: usize) -> Result<Sheet> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let names = workbook.sheet_names();
    let name = names
        .get(index)
        .cloned()
        .ok_or(PipelineError::SheetNotFound {
            index,
            available: names.len(),
        })?;
    let range = workbook.worksheet_range(&name)?;
    Ok(Sheet::from_range(&name, &range))
}

// ─────────────────────────────────────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────────────────────────────────────

/// A template workbook loaded for in-place editing.
///
/// calamine is read-only, so templates go through umya-spreadsheet and keep
/// their formatting when written back out.
pub struct Template {
    book: Spreadsheet,
}

impl Template {
    /// Loads a template workbook from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path)?;
        Ok(Self { book })
    }

    /// Index of the sheet the results are written to: the active tab, or
    /// the first sheet when the active tab is out of range.
    fn target_index(&self) -> usize {
        let active = *self.book.get_workbook_view().get_active_tab() as usize;
        if active < self.book.get_sheet_collection().len() {
            active
        } else {
            0
        }
    }

    /// The sheet the results are written to.
    pub fn target(&self) -> Option<&Worksheet> {
        self.book.get_sheet_collection().get(self.target_index())
    }

    pub fn target_mut(&mut self) -> Option<&mut Worksheet> {
        let index = self.target_index();
        self.book.get_sheet_collection_mut().get_mut(index)
    }

    /// Serializes the workbook as it stands.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut buffer)?;
        Ok(buffer.into_inner())
    }
}

impl From<Spreadsheet> for Template {
    fn from(book: Spreadsheet) -> Self {
        Self { book }
    }
}

/// Spreadsheet address of a 0-based (row, col) cell, e.g. `(2, 2)` is `C3`.
pub fn cell_ref(row: usize, col: usize) -> String {
    const LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut name = String::new();
    let mut n = col + 1;
    while n > 0 {
        name.insert(0, char::from(LETTERS[(n - 1) % 26]));
        n = (n - 1) / 26;
    }
    format!("{name}{}", row + 1)
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod fixtures {
    //! Workbook builders for tests.

    use std::path::Path;

    use rust_xlsxwriter::{Format, Formula, Workbook, XlsxError};

    use super::CellValue;

    fn write_cell(
        sheet: &mut rust_xlsxwriter::Worksheet,
        row: u32,
        col: u16,
        value: &CellValue,
    ) -> Result<(), XlsxError> {
        match value {
            CellValue::Number(n) => {
                sheet.write_number(row, col, *n)?;
            }
            CellValue::Text(s) => {
                sheet.write_string(row, col, s)?;
            }
            CellValue::Bool(b) => {
                sheet.write_boolean(row, col, *b)?;
            }
            CellValue::Empty | CellValue::Error(_) => {}
        }
        Ok(())
    }

    /// Creates a lab workbook with `sheet_count` sheets and writes `rows` to
    /// the sheet at `data_sheet`, starting at A1.
    pub fn create_lab_xlsx(
        path: &Path,
        sheet_count: usize,
        data_sheet: usize,
        rows: &[Vec<CellValue>],
    ) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        for i in 0..sheet_count {
            let sheet = workbook.add_worksheet();
            sheet.set_name(format!("Sheet{}", i + 1))?;
            if i == data_sheet {
                for (r, row) in rows.iter().enumerate() {
                    for (c, value) in row.iter().enumerate() {
                        write_cell(sheet, u32::try_from(r).unwrap(), u16::try_from(c).unwrap(), value)?;
                    }
                }
            }
        }
        workbook.save(path)?;
        Ok(())
    }

    /// Creates a template: a bold title merged over A1:D1, a date in E1, one
    /// label per canonical row in column B (rows 3..), an existing value in C
    /// to be overwritten, a total formula below the block, and a second
    /// "Notes" sheet.
    pub fn create_template_xlsx(path: &Path, labels: &[&str]) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("HWOL")?;
        sheet.merge_range(0, 0, 0, 3, "HWOL OEMA", &Format::new().set_bold())?;
        sheet.write_number_with_format(0, 4, 45358.0, &Format::new().set_num_format("yyyy-mm-dd"))?;
        sheet.set_column_width(1, 40)?;
        sheet.write_string(1, 0, "No.")?;
        sheet.write_string(1, 1, "Determinand")?;
        sheet.write_string(1, 2, "Result")?;
        for (i, label) in labels.iter().enumerate() {
            let row = u32::try_from(i).unwrap() + 2;
            sheet.write_number(row, 0, f64::from(row - 1))?;
            if !label.is_empty() {
                sheet.write_string(row, 1, *label)?;
            }
            sheet.write_string(row, 2, "old")?;
        }
        let below = u32::try_from(labels.len()).unwrap() + 2;
        sheet.write_formula(below, 0, Formula::new("=COUNTA(B3:B50)"))?;

        let notes = workbook.add_worksheet();
        notes.set_name("Notes")?;
        notes.write_string(0, 0, "Generated from lab results")?;

        workbook.save(path)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn cell_value_from_data_type() {
        assert_eq!(CellValue::from(&Data::Empty), CellValue::Empty);
        assert_eq!(CellValue::from(&Data::Int(42)), CellValue::Number(42.0));
        assert_eq!(CellValue::from(&Data::Float(2.5)), CellValue::Number(2.5));
        assert_eq!(
            CellValue::from(&Data::String("Lead".to_string())),
            CellValue::Text("Lead".to_string())
        );
        assert_eq!(CellValue::from(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn sheet_cell_out_of_range_is_empty() {
        let sheet = Sheet::from_rows("s", vec![vec![CellValue::Number(1.0)]]);
        assert_eq!(sheet.cell(0, 0).as_number(), Some(1.0));
        assert!(sheet.cell(5, 5).is_empty());
        assert_eq!(sheet.height(), 1);
        assert_eq!(sheet.width(), 1);
    }

    #[test]
    fn read_sheet_at_picks_requested_sheet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("lab.xlsx");
        let rows = vec![
            vec![CellValue::Text("Determinand".into()), CellValue::Text("S1".into())],
            vec![CellValue::Text("Lead".into()), CellValue::Number(12.5)],
        ];
        create_lab_xlsx(&path, 3, 2, &rows).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let sheet = read_sheet_at(&bytes, 2).unwrap();
        assert_eq!(sheet.name, "Sheet3");
        assert_eq!(sheet.cell(1, 0).as_text(), Some("Lead"));
        assert_eq!(sheet.cell(1, 1).as_number(), Some(12.5));
    }

    #[test]
    fn read_sheet_at_anchors_at_a1() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("lab.xlsx");
        let rows = vec![
            vec![],
            vec![],
            vec![CellValue::Empty, CellValue::Text("Arsenic".into())],
        ];
        create_lab_xlsx(&path, 1, 0, &rows).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let sheet = read_sheet_at(&bytes, 0).unwrap();
        assert_eq!(sheet.height(), 3);
        assert_eq!(sheet.width(), 2);
        assert_eq!(sheet.cell(2, 1).as_text(), Some("Arsenic"));
    }

    #[test]
    fn read_sheet_at_missing_sheet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("lab.xlsx");
        create_lab_xlsx(&path, 1, 0, &[]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let err = read_sheet_at(&bytes, 2).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SheetNotFound {
                index: 2,
                available: 1
            }
        ));
    }

    #[test]
    fn read_sheet_at_rejects_garbage() {
        let result = read_sheet_at(b"not a workbook", 0);
        assert!(matches!(result, Err(PipelineError::Read(_))));
    }

    #[test]
    fn template_targets_the_active_sheet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("template.xlsx");
        create_template_xlsx(&path, &["", "Antimony", "Arsenic"]).unwrap();

        let template = Template::open(&path).unwrap();
        let target = template.target().unwrap();
        assert_eq!(target.get_name(), "HWOL");
        assert_eq!(target.get_value("B4"), "Antimony");
        assert_eq!(target.get_highest_row(), 6);
    }

    #[test]
    fn cell_refs_use_column_letters() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(2, 2), "C3");
        assert_eq!(cell_ref(9, 25), "Z10");
        assert_eq!(cell_ref(0, 26), "AA1");
    }

    #[test]
    fn read_nonexistent_template_returns_error() {
        let result = Template::open(Path::new("/nonexistent/template.xlsx"));
        assert!(result.is_err());
    }
}
