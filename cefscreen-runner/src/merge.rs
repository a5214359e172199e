//! Result merger.
//!
//! Per-field frames are concatenated column-wise onto the union of their
//! indices. Rows a frame does not cover get a missing cell; no row is ever
//! dropped.

use cefscreen_core::frame::{Cell, FieldFrame};
use polars::prelude::{Column, DataFrame, PolarsResult};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One output column, aligned to the table index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl TableColumn {
    /// True when every present cell is numeric.
    pub fn is_numeric(&self) -> bool {
        self.cells.iter().all(|c| !matches!(c, Cell::Text(_)))
    }

    /// Numeric view in row order, missing cells as NaN.
    pub fn values(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|c| c.as_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

/// The merged screen result: rows keyed by security id (ascending), one
/// column per requested field in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub index: Vec<String>,
    pub columns: Vec<TableColumn>,
}

impl ResultTable {
    /// Merge frames on the union of their indices.
    pub fn merge(frames: &[FieldFrame]) -> Self {
        let keys: BTreeSet<&str> = frames.iter().flat_map(|f| f.keys()).collect();
        let index: Vec<String> = keys.into_iter().map(String::from).collect();
        let position: HashMap<&str, usize> = index
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();

        let columns = frames
            .iter()
            .map(|frame| {
                let mut cells = vec![Cell::Missing; index.len()];
                for (key, cell) in &frame.rows {
                    if let Some(&row) = position.get(key.as_str()) {
                        cells[row] = cell.clone();
                    }
                }
                TableColumn {
                    name: frame.field.clone(),
                    cells,
                }
            })
            .collect();

        let table = Self { index, columns };
        tracing::debug!(
            rows = table.row_count(),
            columns = table.column_count(),
            "merged result frames"
        );
        table
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cell for security `id` in column `name`.
    pub fn get(&self, id: &str, name: &str) -> Option<&Cell> {
        let row = self.index.iter().position(|k| k == id)?;
        self.column(name).map(|c| &c.cells[row])
    }

    /// Convert to a polars frame: an `id` column, then one column per field.
    /// Numeric columns are nullable `f64`, the rest nullable strings.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::new("id".into(), self.index.clone()));
        for col in &self.columns {
            let column = if col.is_numeric() {
                let values: Vec<Option<f64>> = col.cells.iter().map(Cell::as_f64).collect();
                Column::new(col.name.as_str().into(), values)
            } else {
                let values: Vec<Option<String>> = col
                    .cells
                    .iter()
                    .map(|c| (!c.is_missing()).then(|| c.to_string()))
                    .collect();
                Column::new(col.name.as_str().into(), values)
            };
            columns.push(column);
        }
        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, rows: &[(&str, Cell)]) -> FieldFrame {
        let mut f = FieldFrame::new(name);
        for (k, c) in rows {
            f.push(*k, c.clone());
        }
        f
    }

    #[test]
    fn union_of_indices_sorted() {
        let frames = vec![
            frame("price", &[("BBB", Cell::Num(2.0)), ("AAA", Cell::Num(1.0))]),
            frame("name", &[("CCC", Cell::Text("Gamma".into()))]),
        ];
        let table = ResultTable::merge(&frames);
        assert_eq!(table.index, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(table.column_names(), vec!["price", "name"]);
        assert_eq!(table.get("CCC", "price"), Some(&Cell::Missing));
        assert_eq!(table.get("BBB", "price"), Some(&Cell::Num(2.0)));
        assert_eq!(table.get("AAA", "name"), Some(&Cell::Missing));
    }

    #[test]
    fn grouped_row_order_is_normalized() {
        // A group-sorted field arrives out of id order.
        let frames = vec![frame(
            "name",
            &[("ZZZ", Cell::Text("z".into())), ("AAA", Cell::Text("a".into()))],
        )];
        let table = ResultTable::merge(&frames);
        assert_eq!(table.index, vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn empty_frames_give_empty_table() {
        let table = ResultTable::merge(&[frame("price", &[])]);
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn dataframe_view_types_columns() {
        let frames = vec![
            frame("name", &[("AAA", Cell::Text("Alpha".into())), ("BBB", Cell::Missing)]),
            frame("price", &[("AAA", Cell::Num(1.5))]),
        ];
        let df = ResultTable::merge(&frames).to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, 3));
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["id", "name", "price"]);
        assert_eq!(df.column("price").unwrap().null_count(), 1);
        assert_eq!(df.column("name").unwrap().null_count(), 1);
    }
}
