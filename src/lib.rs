// Reports library.
// GitHub API client built on a revalidating HTTP response cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, CacheKey, CacheLayer, FileStorage, MemoryStorage, Storage};
pub use config::{CacheConfig, StorageKind};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use logging::LogLayer;
pub use transport::{ReqwestTransport, Response, Transport};
