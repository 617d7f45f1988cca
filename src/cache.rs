use crate::error::Result;
use crate::loader::LoadedDataset;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub type CacheKey = String;

/// Loaded datasets keyed by source, populated on first access and kept
/// until explicitly invalidated.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<CacheKey, Arc<LoadedDataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<LoadedDataset>> {
        self.entries.get(key).cloned()
    }

    /// Return the cached dataset for `key`, running `load` only on a miss.
    /// A failed load leaves the cache untouched.
    pub fn get_or_load<F>(&mut self, key: &str, load: F) -> Result<Arc<LoadedDataset>>
    where
        F: FnOnce() -> Result<LoadedDataset>,
    {
        if let Some(hit) = self.entries.get(key) {
            debug!(key, "dataset cache hit");
            return Ok(Arc::clone(hit));
        }
        let loaded = Arc::new(load()?);
        self.entries.insert(key.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            info!(key, "dataset cache entry invalidated");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
