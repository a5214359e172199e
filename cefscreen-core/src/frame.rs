//! Per-field result frames returned by a query client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single result value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Num(f64),
    Text(String),
    #[default]
    Missing,
}

impl Cell {
    /// Numeric cell, with non-finite values folded into `Missing`.
    pub fn num(value: f64) -> Self {
        if value.is_finite() {
            Cell::Num(value)
        } else {
            Cell::Missing
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Num(v) => write!(f, "{v}"),
            Cell::Text(t) => write!(f, "{t}"),
            Cell::Missing => Ok(()),
        }
    }
}

/// Result of one requested field: rows keyed by security identifier (or by
/// group value for group-count fields), in the order the service returned
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldFrame {
    pub field: String,
    pub rows: Vec<(String, Cell)>,
}

impl FieldFrame {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, cell: Cell) {
        self.rows.push((key.into(), cell));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.rows.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }
}
