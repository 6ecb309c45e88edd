// HTTP response cache.
// Stores successful GET responses and revalidates stale ones with the origin.

pub mod disk;
pub mod entry;
pub mod freshness;
pub mod key;
pub mod layer;
pub mod stats;
pub mod storage;

pub use disk::FileStorage;
pub use entry::CacheEntry;
pub use freshness::Freshness;
pub use key::CacheKey;
pub use layer::{CacheLayer, STATUS_CACHED, STATUS_STALE};
pub use stats::CacheStats;
pub use storage::{MemoryStorage, Storage};
