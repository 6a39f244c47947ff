use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use super::{DataStore, Record, Row, StoreError};

const MAX_CACHED_TABLES: u64 = 16;

/// Read-through cache over a [`DataStore`].
///
/// Reads of the same table within `ttl` are served from memory and may be
/// stale with respect to writes made by other processes. Appends made
/// through this wrapper drop the cached copy of the table they touch.
/// A zero `ttl` turns caching off.
pub struct CachedStore<S> {
    inner: S,
    tables: Option<Cache<String, Vec<Record>>>,
}

impl<S: DataStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        let tables = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHED_TABLES)
                .time_to_live(ttl)
                .build()
        });
        Self { inner, tables }
    }

    /// Reads straight from the backing store and refreshes the cached copy.
    pub fn read_fresh(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        let records = self.inner.read_table(name)?;
        if let Some(tables) = &self.tables {
            tables.insert(name.to_string(), records.clone());
        }
        Ok(records)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Direct access to the backing store; cached reads are left as they are.
    #[cfg(test)]
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: DataStore> DataStore for CachedStore<S> {
    fn read_table(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        if let Some(records) = self.tables.as_ref().and_then(|tables| tables.get(name)) {
            debug!(sheet = name, "serving sheet from cache");
            return Ok(records);
        }
        self.read_fresh(name)
    }

    fn append_rows(&mut self, name: &str, rows: &[Row]) -> Result<(), StoreError> {
        let result = self.inner.append_rows(name, rows);
        if let Some(tables) = &self.tables {
            tables.invalidate(name);
        }
        result
    }
}
