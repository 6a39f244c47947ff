use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod cache;
#[cfg(test)]
pub mod memory;
mod sqlite;

pub use cache::CachedStore;
pub use sqlite::SqliteStore;

/// A single scalar value as it appears in a sheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Real(f64),
    Text(String),
    #[default]
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Empty => Ok(()),
        }
    }
}

/// Column name -> cell. Column names are case-sensitive.
pub type Record = BTreeMap<String, Cell>;

/// Cells in the target sheet's header order.
pub type Row = Vec<Cell>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("row {index} for table {table} has {actual} cells, header has {expected}")]
    RowWidth {
        table: String,
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("table {table} already exists with header {existing:?}, expected {expected:?}")]
    HeaderMismatch {
        table: String,
        existing: Vec<String>,
        expected: Vec<String>,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode or decode row values")]
    Encoding(#[from] serde_json::Error),

    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),
}

/// Contract with the shared table store backing the annotation workflow.
///
/// `append_rows` is all-or-nothing per call: either every row lands or the
/// table is left as it was and an error is returned.
pub trait DataStore {
    fn read_table(&self, name: &str) -> Result<Vec<Record>, StoreError>;

    fn append_rows(&mut self, name: &str, rows: &[Row]) -> Result<(), StoreError>;

    fn append_row(&mut self, name: &str, row: Row) -> Result<(), StoreError> {
        self.append_rows(name, std::slice::from_ref(&row))
    }
}

pub(crate) fn record_from_row(header: &[String], values: Vec<Cell>) -> Record {
    let mut values = values.into_iter();
    header
        .iter()
        .map(|column| (column.clone(), values.next().unwrap_or_default()))
        .collect()
}

pub(crate) fn check_row_widths(table: &str, expected: usize, rows: &[Row]) -> Result<(), StoreError> {
    for (index, row) in rows.iter().enumerate() {
        if row.len() != expected {
            return Err(StoreError::RowWidth {
                table: table.to_string(),
                index,
                expected,
                actual: row.len(),
            });
        }
    }
    Ok(())
}
