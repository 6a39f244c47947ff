use std::cell::Cell as CountCell;
use std::collections::{BTreeMap, HashSet};

use super::{Cell, DataStore, Record, Row, StoreError, check_row_widths, record_from_row};

/// In-memory sheets with switchable append failures.
#[derive(Default)]
pub struct MemoryStore {
    sheets: BTreeMap<String, (Vec<String>, Vec<Row>)>,
    failing_tables: HashSet<String>,
    reads: CountCell<usize>,
}

impl MemoryStore {
    pub fn with_sheet(mut self, name: &str, header: &[&str], rows: Vec<Row>) -> Self {
        self.sheets.insert(
            name.to_string(),
            (header.iter().map(|column| column.to_string()).collect(), rows),
        );
        self
    }

    pub fn fail_appends_to(&mut self, name: &str) {
        self.failing_tables.insert(name.to_string());
    }

    pub fn heal(&mut self) {
        self.failing_tables.clear();
    }

    pub fn rows(&self, name: &str) -> &[Row] {
        self.sheets
            .get(name)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or_default()
    }

    pub fn push_raw(&mut self, name: &str, row: Vec<Cell>) {
        if let Some((_, rows)) = self.sheets.get_mut(name) {
            rows.push(row);
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.get()
    }
}

impl DataStore for MemoryStore {
    fn read_table(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        self.reads.set(self.reads.get() + 1);
        let (header, rows) = self
            .sheets
            .get(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        Ok(rows
            .iter()
            .map(|row| record_from_row(header, row.clone()))
            .collect())
    }

    fn append_rows(&mut self, name: &str, rows: &[Row]) -> Result<(), StoreError> {
        if self.failing_tables.contains(name) {
            return Err(StoreError::Unavailable(format!("append to {name} rejected")));
        }
        let (header, existing) = self
            .sheets
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        check_row_widths(name, header.len(), rows)?;
        existing.extend(rows.iter().cloned());
        Ok(())
    }
}
