use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

use super::{Cell, DataStore, Record, Row, StoreError, check_row_widths, record_from_row};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

/// Spreadsheet-like store: named sheets with a fixed header, rows appended in order.
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection =
            Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().context("failed to open in-memory db")?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Creates the sheet, or checks that an existing sheet carries the same header.
    pub fn ensure_sheet(&self, name: &str, header: &[String]) -> Result<bool, StoreError> {
        if let Some(existing) = self.header(name)? {
            if existing != header {
                return Err(StoreError::HeaderMismatch {
                    table: name.to_string(),
                    existing,
                    expected: header.to_vec(),
                });
            }
            return Ok(false);
        }

        self.connection.execute(
            "INSERT INTO sheets(name, header_json, created_at) VALUES(?1, ?2, ?3)",
            params![name, serde_json::to_string(header)?, now_utc_string()],
        )?;
        debug!(sheet = name, columns = header.len(), "created sheet");
        Ok(true)
    }

    pub fn header(&self, name: &str) -> Result<Option<Vec<String>>, StoreError> {
        let raw: Option<String> = self
            .connection
            .query_row(
                "SELECT header_json FROM sheets WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn row_count(&self, name: &str) -> Result<i64, StoreError> {
        let count = self.connection.query_row(
            "SELECT COUNT(*) FROM sheet_rows WHERE sheet_name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .connection
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Appends `rows` and sets the metadata `entries` in one transaction.
    pub fn append_rows_recording(
        &mut self,
        name: &str,
        rows: &[Row],
        entries: &[(&str, &str)],
    ) -> Result<(), StoreError> {
        let header = self.require_header(name)?;
        check_row_widths(name, header.len(), rows)?;
        let encoded = rows
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let appended_at = now_utc_string();
        insert_rows(&mut self.connection, name, &encoded, &appended_at, entries)
            .map_err(classify)?;

        debug!(sheet = name, rows = rows.len(), "appended rows");
        Ok(())
    }

    fn require_header(&self, name: &str) -> Result<Vec<String>, StoreError> {
        self.header(name)?
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }
}

impl DataStore for SqliteStore {
    fn read_table(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        let header = self.require_header(name)?;

        let mut statement = self.connection.prepare(
            "SELECT values_json FROM sheet_rows WHERE sheet_name = ?1 ORDER BY row_seq",
        )?;
        let mut rows = statement.query([name])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let values: Vec<Cell> = serde_json::from_str(&raw)?;
            records.push(record_from_row(&header, values));
        }

        debug!(sheet = name, rows = records.len(), "read sheet");
        Ok(records)
    }

    fn append_rows(&mut self, name: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.append_rows_recording(name, rows, &[])
    }
}

fn insert_rows(
    connection: &mut Connection,
    name: &str,
    encoded: &[String],
    appended_at: &str,
    entries: &[(&str, &str)],
) -> rusqlite::Result<()> {
    let tx = connection.transaction()?;
    {
        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(row_seq), 0) + 1 FROM sheet_rows WHERE sheet_name = ?1",
            [name],
            |row| row.get(0),
        )?;

        let mut statement = tx.prepare(
            "INSERT INTO sheet_rows(sheet_name, row_seq, values_json, appended_at)
             VALUES(?1, ?2, ?3, ?4)",
        )?;
        for (offset, values_json) in encoded.iter().enumerate() {
            statement.execute(params![name, next_seq + offset as i64, values_json, appended_at])?;
        }
    }
    {
        let mut upsert = tx.prepare(
            "INSERT INTO metadata(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        )?;
        upsert.execute(["db_updated_at", appended_at])?;
        for (key, value) in entries {
            upsert.execute([*key, *value])?;
        }
    }
    tx.commit()
}

/// Lock contention from another annotator's write is reported as unavailable.
fn classify(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sheets (
              name TEXT PRIMARY KEY,
              header_json TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sheet_rows (
              sheet_name TEXT NOT NULL,
              row_seq INTEGER NOT NULL,
              values_json TEXT NOT NULL,
              appended_at TEXT NOT NULL,
              PRIMARY KEY (sheet_name, row_seq),
              FOREIGN KEY (sheet_name) REFERENCES sheets(name)
            );
            ",
        )
        .context("failed to create sheet schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;

    Ok(())
}
