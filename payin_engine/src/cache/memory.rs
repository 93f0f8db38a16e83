use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use crate::{
    cache::{CacheBackend, CacheEntry, CacheError},
    helpers::{SharedClock, SystemClock},
};

/// An in-process cache. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry<String>>>>,
    clock: SharedClock,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryCache {
    pub fn new(clock: SharedClock) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), clock }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|e| CacheError::Backend(e.to_string()))?;
        let value = entries.get(key).filter(|entry| entry.is_fresh(now)).map(|entry| entry.value.clone());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CacheError::Backend(format!("Invalid TTL: {e}")))?;
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|e| CacheError::Backend(e.to_string()))?;
        entries.retain(|_, entry| entry.is_fresh(now));
        entries.insert(key.to_string(), CacheEntry::new(value.to_string(), now + ttl));
        Ok(())
    }
}
