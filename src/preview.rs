//! Mapped-table previews (`--preview csv|json`).

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

use crate::layout::Variant;
use crate::pipeline::MappedTable;

/// Output format for `--preview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PreviewFormat {
    Csv,
    Json,
}

/// One canonical row as it would land in the template.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PreviewRow<'a> {
    /// 1-based spreadsheet row.
    pub row: usize,
    pub key: &'a str,
    pub result: String,
}

pub fn preview_rows(table: &MappedTable, variant: Variant) -> Vec<PreviewRow<'_>> {
    let first = variant.layout().output_first_row as usize + 1;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| PreviewRow {
            row: first + i,
            key: &r.key,
            result: r.result.to_string(),
        })
        .collect()
}

/// Writes `row,key,result` lines with a header.
pub fn write_csv(table: &MappedTable, variant: Variant, out: impl Write) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in preview_rows(table, variant) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the rows plus a match summary as pretty JSON.
pub fn write_json(table: &MappedTable, variant: Variant, mut out: impl Write) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "variant": variant.label(),
        "summary": {
            "determinands": table.determinand_count(),
            "matched": table.matched_count(),
            "unmatched": &table.unmatched,
        },
        "rows": preview_rows(table, variant),
    });
    serde_json::to_writer_pretty(&mut out, &output)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_preview(
    format: PreviewFormat,
    table: &MappedTable,
    variant: Variant,
    out: impl Write,
) -> anyhow::Result<()> {
    match format {
        PreviewFormat::Csv => write_csv(table, variant, out),
        PreviewFormat::Json => write_json(table, variant, out),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchedRow, Reading, ResultValue};
    use pretty_assertions::assert_eq;

    fn table() -> MappedTable {
        MappedTable {
            rows: vec![
                MatchedRow::placeholder(),
                MatchedRow {
                    key: "lead".into(),
                    source: Some("Lead".into()),
                    result: ResultValue::Parsed(Reading::parse("<0.5", true).unwrap()),
                },
                MatchedRow {
                    key: "zinc".into(),
                    source: None,
                    result: ResultValue::Empty,
                },
            ],
            unmatched: vec!["zinc".into()],
        }
    }

    #[test]
    fn csv_lists_every_row() {
        let mut out = Vec::new();
        write_csv(&table(), Variant::Dets, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "row,key,result\n3,,\n4,lead,<0.5\n5,zinc,\n");
    }

    #[test]
    fn json_has_summary() {
        let mut out = Vec::new();
        write_json(&table(), Variant::Standard, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["variant"], "Standard");
        assert_eq!(value["summary"]["matched"], 1);
        assert_eq!(value["summary"]["determinands"], 2);
        assert_eq!(value["summary"]["unmatched"][0], "zinc");
        assert_eq!(value["rows"][1]["result"], "<0.5");
        assert_eq!(value["rows"].as_array().unwrap().len(), 3);
    }
}
