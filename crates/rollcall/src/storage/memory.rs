//! In-process collection store.
//!
//! Nothing survives the process. Useful for tests and dry runs.

use std::collections::HashMap;

use serde_json::Value;

use super::{KeyValueStore, StoreKey};
use crate::error::Result;

/// Volatile [`KeyValueStore`] kept in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<StoreKey, Value>,
    writes: usize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<Value>> {
        Ok(self.values.get(&key).cloned())
    }

    fn set(&mut self, key: StoreKey, value: &Value) -> Result<()> {
        self.values.insert(key, value.clone());
        self.writes += 1;
        Ok(())
    }
}
