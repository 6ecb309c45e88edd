// Storage port for cached responses.
// The read/write contract the cache depends on, plus the in-memory backend.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::entry::CacheEntry;
use super::key::CacheKey;

/// Key/value store for cache entries.
///
/// Both operations are total: a backend that fails internally reports a
/// missing entry on `read` and drops the update on `write`.
pub trait Storage: Send + Sync {
    /// Stored entry for `key`, or `None` if never cached.
    fn read(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Insert or replace the entry for `key`. Last write wins.
    fn write(&self, key: &CacheKey, entry: CacheEntry);
}

/// Unbounded in-process map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &CacheKey, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), entry);
    }
}
