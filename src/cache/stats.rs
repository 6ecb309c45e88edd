// Cache outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-layer counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Fresh entries served without contacting the origin.
    pub hits: AtomicU64,
    /// Lookups that found nothing stored.
    pub misses: AtomicU64,
    /// Stale entries confirmed by a 304.
    pub revalidated: AtomicU64,
    /// Stale entries replaced by a new 2xx response.
    pub replaced: AtomicU64,
    /// Non-GET requests passed through.
    pub bypassed: AtomicU64,
    /// Entries written to storage.
    pub stores: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of GET lookups answered without a body transfer (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits.load(Ordering::Relaxed) + self.revalidated.load(Ordering::Relaxed);
        let total = served
            + self.misses.load(Ordering::Relaxed)
            + self.replaced.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
