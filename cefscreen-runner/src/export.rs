//! Export: plain-text table, CSV, JSON and Parquet renditions of a screen.
//!
//! CSV, JSON and Parquet carry raw values (missing cells empty / null); the
//! text table carries the formatted values the grid shows.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::ParquetWriter;
use serde::Serialize;

use cefscreen_core::frame::Cell;

use crate::format::GridSpec;
use crate::merge::ResultTable;

// ─── Text table ─────────────────────────────────────────────────────

/// Formatted grid as aligned text, one line per security.
pub fn table_text(grid: &GridSpec) -> String {
    let table = &grid.table;
    let mut header = vec!["id".to_string()];
    header.extend(table.columns.iter().map(|c| c.name.clone()));

    let rows: Vec<Vec<String>> = (0..table.row_count())
        .map(|row| {
            let mut line = vec![table.index[row].clone()];
            line.extend((0..table.column_count()).map(|col| grid.cell_text(row, col)));
            line
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = render(&header);
    out.push('\n');
    for row in &rows {
        out.push_str(&render(row));
        out.push('\n');
    }
    out
}

// ─── CSV export ─────────────────────────────────────────────────────

fn raw(cell: &Cell) -> String {
    cell.to_string()
}

/// CSV with an `id` column followed by the fields in request order.
pub fn export_csv(table: &ResultTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["id"];
    header.extend(table.column_names());
    wtr.write_record(&header)?;

    for (row, id) in table.index.iter().enumerate() {
        let mut record = vec![id.clone()];
        record.extend(table.columns.iter().map(|c| raw(&c.cells[row])));
        wtr.write_record(&record)?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonRow<'a> {
    id: &'a str,
    values: Vec<&'a Cell>,
}

#[derive(Serialize)]
struct JsonTable<'a> {
    columns: Vec<&'a str>,
    rows: Vec<JsonRow<'a>>,
}

/// Pretty JSON: `{"columns": [...], "rows": [{"id", "values"}]}`.
pub fn export_json(table: &ResultTable) -> Result<String> {
    let doc = JsonTable {
        columns: table.column_names(),
        rows: table
            .index
            .iter()
            .enumerate()
            .map(|(row, id)| JsonRow {
                id,
                values: table.columns.iter().map(|c| &c.cells[row]).collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc).context("failed to serialize result table to JSON")
}

// ─── Parquet export ─────────────────────────────────────────────────

pub fn write_parquet(path: &Path, table: &ResultTable) -> Result<()> {
    let mut df = table
        .to_dataframe()
        .context("failed to build result dataframe")?;
    let mut file = File::create(path)
        .with_context(|| format!("failed to create parquet {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .context("failed to write result parquet")?;
    Ok(())
}

/// Write `table` to `path`, picking the format from the extension
/// (`.csv`, `.json`, `.parquet`).
pub fn write_file(path: &Path, table: &ResultTable) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "parquet" => write_parquet(path, table),
        "json" => std::fs::write(path, export_json(table)?)
            .with_context(|| format!("failed to write {}", path.display())),
        _ => std::fs::write(path, export_csv(table)?)
            .with_context(|| format!("failed to write {}", path.display())),
    }
}
