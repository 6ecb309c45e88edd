// Cache configuration.
// Layered loading from built-in defaults and REPORTS_* environment variables.

use std::path::PathBuf;
use std::sync::Arc;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::cache::{FileStorage, MemoryStorage, Storage, disk};
use crate::error::{Error, Result};

/// Which storage backend the client pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Disk,
}

/// Cache behaviour settings.
///
/// Loading precedence (highest wins):
/// 1. Environment variables prefixed with `REPORTS_`
/// 2. Built-in defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Header added to responses served from the cache.
    ///
    /// Set via REPORTS_STATUS_HEADER.
    #[serde(default = "default_status_header")]
    pub status_header: String,

    /// Treat `no-cache` and `no-store` entries as always stale.
    #[serde(default = "default_true")]
    pub honor_no_cache: bool,

    /// Skip storing responses marked `no-store`.
    #[serde(default = "default_true")]
    pub honor_no_store: bool,

    /// Serve the stored entry when a revalidation request fails in transport.
    #[serde(default)]
    pub serve_stale_on_error: bool,

    /// Set via REPORTS_STORAGE (`memory` or `disk`).
    #[serde(default)]
    pub storage: StorageKind,

    /// Directory for disk storage. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_status_header() -> String {
    "X-Cache-Status".into()
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            status_header: default_status_header(),
            honor_no_cache: true,
            honor_no_store: true,
            serve_stale_on_error: false,
            storage: StorageKind::Memory,
            cache_dir: None,
        }
    }
}

impl CacheConfig {
    /// Load configuration from defaults and the environment.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Self::default())).merge(
                Env::prefixed("REPORTS_").map(|key| key.as_str().to_lowercase().into()),
            ),
        )
    }

    /// Extract and validate configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.status_header_name()?;
        Ok(config)
    }

    /// The configured status header as a validated header name.
    pub fn status_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.status_header.as_bytes()).map_err(|_| {
            Error::Config(format!("invalid status_header '{}'", self.status_header))
        })
    }

    /// Construct the configured storage backend.
    pub fn build_storage(&self) -> Result<Arc<dyn Storage>> {
        match self.storage {
            StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageKind::Disk => {
                let dir = self
                    .cache_dir
                    .clone()
                    .or_else(disk::default_dir)
                    .ok_or_else(|| Error::Config("no cache directory available".into()))?;
                Ok(Arc::new(FileStorage::new(dir)))
            }
        }
    }
}
