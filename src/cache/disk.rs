// Filesystem storage backend.
// Persists cache entries as JSON files keyed by a hash of the cache key.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::storage::Storage;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Default response cache directory (~/.cache/reports/responses on Linux).
pub fn default_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "reports").map(|dirs| dirs.cache_dir().join("responses"))
}

/// On-disk wrapper carrying the full key alongside the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    stored_at: DateTime<Utc>,
    entry: CacheEntry,
}

/// One JSON file per cached URL under a root directory.
///
/// Unreadable or corrupt files are reported as cache misses.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage rooted at [`default_dir`].
    pub fn open_default() -> Option<Self> {
        default_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key.digest()))
    }

    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let stored: StoredEntry = serde_json::from_str(&contents)?;

        if stored.key != key.as_str() {
            tracing::warn!(key = %key, found = %stored.key, "cache file key mismatch");
            return Ok(None);
        }

        tracing::debug!(key = %key, stored_at = %stored.stored_at, "read cache entry from disk");
        Ok(Some(stored.entry))
    }

    fn save(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let stored = StoredEntry {
            key: key.to_string(),
            stored_at: Utc::now(),
            entry,
        };
        let json = serde_json::to_vec(&stored)?;

        // Write atomically via a temp file unique to this writer
        let path = self.entry_path(key);
        let temp_path = self.root.join(format!(
            "{}.{}.{}.tmp",
            key.digest(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = write_file(&temp_path, &json).and_then(|()| fs::rename(&temp_path, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl Storage for FileStorage {
    fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.load(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read cache entry, treating as miss");
                None
            }
        }
    }

    fn write(&self, key: &CacheKey, entry: CacheEntry) {
        if let Err(e) = self.save(key, entry) {
            tracing::warn!(key = %key, error = %e, "failed to write cache entry");
        }
    }
}
