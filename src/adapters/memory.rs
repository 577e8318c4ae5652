//! In-memory adapters for simulation and tests.
//!
//! [`MemoryStore`] stands in for Redis and [`StaticCatalog`] for the
//! InfluxDB measurement listing.  Both support failure injection so the
//! loop's isolation and breaker behaviour can be exercised without a
//! network.

use std::collections::{HashMap, HashSet};

use crate::app::ports::{CatalogError, ReadingStore, SensorCatalog, StoreError};

/// Key-value store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    failing_keys: HashSet<String>,
    offline: bool,
    reads: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }

    /// Every read fails with [`StoreError::Unavailable`] while offline.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Reads of `key` fail with [`StoreError::Timeout`].
    pub fn fail_key(&mut self, key: &str) {
        self.failing_keys.insert(key.to_owned());
    }

    pub fn heal_key(&mut self, key: &str) {
        self.failing_keys.remove(key);
    }

    /// Number of `get` calls seen, failed ones included.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl ReadingStore for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads += 1;
        if self.offline {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        if self.failing_keys.contains(key) {
            return Err(StoreError::Timeout);
        }
        Ok(self.values.get(key).cloned())
    }
}

/// Fixed measurement listing.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    names: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl SensorCatalog for StaticCatalog {
    fn list(&mut self) -> Result<Vec<String>, CatalogError> {
        Ok(self.names.clone())
    }
}
