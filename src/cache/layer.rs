// Caching stage of the request pipeline.
// Serves fresh GET responses from storage and revalidates stale ones with If-None-Match.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Method, Request, StatusCode,
    header::{DATE, ETAG, HeaderName, HeaderValue, IF_NONE_MATCH},
};
use url::Url;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::transport::{Response, Transport};

use super::entry::CacheEntry;
use super::freshness;
use super::key::CacheKey;
use super::stats::CacheStats;
use super::storage::Storage;

/// Marker value for responses served from a fresh entry.
pub const STATUS_CACHED: &str = "cached";
/// Marker value for stale entries served because the origin was unreachable.
pub const STATUS_STALE: &str = "stale";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Pipeline stage that caches successful GET responses.
///
/// Per request the layer does one storage read and at most one write. The
/// write happens only after the inner stage has returned a complete response.
/// Concurrent requests for the same stale key are not coalesced; each
/// revalidates and the last write wins.
pub struct CacheLayer<T> {
    inner: T,
    storage: Arc<dyn Storage>,
    config: CacheConfig,
    status_header: HeaderName,
    clock: Clock,
    stats: CacheStats,
}

impl<T: Transport> CacheLayer<T> {
    /// Wrap `inner` with the default configuration.
    pub fn new(inner: T, storage: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            storage,
            config: CacheConfig::default(),
            status_header: HeaderName::from_static("x-cache-status"),
            clock: Arc::new(Utc::now),
            stats: CacheStats::new(),
        }
    }

    pub fn with_config(inner: T, storage: Arc<dyn Storage>, config: CacheConfig) -> Result<Self> {
        let status_header = config.status_header_name()?;
        Ok(Self {
            status_header,
            config,
            ..Self::new(inner, storage)
        })
    }

    /// Replace the clock used for freshness decisions.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        freshness::is_stale(entry, now)
            || (self.config.honor_no_cache && freshness::forbids_reuse(entry))
    }

    /// Synthesize a response from a stored entry, tagged with `marker`.
    fn serve(&self, entry: &CacheEntry, url: Url, marker: &'static str) -> Response {
        let mut response = entry.to_response(url);
        response
            .headers
            .insert(self.status_header.clone(), HeaderValue::from_static(marker));
        response
    }

    /// Write a successful response to storage. Anything else is left alone.
    fn store(&self, key: &CacheKey, response: &Response) {
        if !response.is_success() {
            tracing::debug!(key = %key, status = %response.status, "not caching unsuccessful response");
            return;
        }

        let entry = CacheEntry::from_response(response);
        if self.config.honor_no_store && freshness::forbids_storage(&entry) {
            tracing::debug!(key = %key, "not caching no-store response");
            return;
        }

        self.storage.write(key, entry);
        CacheStats::record(&self.stats.stores);
    }

    async fn fetch(&self, key: &CacheKey, request: Request) -> Result<Response> {
        let response = self.inner.send(request).await?;
        self.store(key, &response);
        Ok(response)
    }

    async fn revalidate(
        &self,
        key: &CacheKey,
        entry: CacheEntry,
        mut request: Request,
    ) -> Result<Response> {
        let conditional = match entry.etag().and_then(|etag| HeaderValue::from_str(etag).ok()) {
            Some(etag) => {
                request.headers_mut().insert(IF_NONE_MATCH, etag);
                true
            }
            None => false,
        };
        let url = request.url().clone();

        let response = match self.inner.send(request).await {
            Ok(response) => response,
            Err(e) if self.config.serve_stale_on_error => {
                tracing::warn!(key = %key, error = %e, "revalidation failed, serving stale entry");
                return Ok(self.serve(&entry, url, STATUS_STALE));
            }
            Err(e) => return Err(e),
        };

        if conditional && response.status == StatusCode::NOT_MODIFIED {
            tracing::debug!(key = %key, "revalidated, not modified");
            let merged = merge_not_modified(entry, &response);
            let result = merged.to_response(response.url);
            self.storage.write(key, merged);
            CacheStats::record(&self.stats.revalidated);
            CacheStats::record(&self.stats.stores);
            return Ok(result);
        }

        tracing::debug!(key = %key, status = %response.status, "revalidation returned new response");
        if response.is_success() {
            CacheStats::record(&self.stats.replaced);
        }
        self.store(key, &response);
        Ok(response)
    }
}

/// Keep the stored status and body, take `Date` and `ETag` from the 304.
fn merge_not_modified(mut entry: CacheEntry, response: &Response) -> CacheEntry {
    if let Some(date) = response.header(DATE) {
        entry.set_header(DATE.as_str(), date);
    }
    if let Some(etag) = response.header(ETAG) {
        entry.set_header(ETAG.as_str(), etag);
    }
    entry
}

#[async_trait]
impl<T: Transport> Transport for CacheLayer<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        if request.method() != Method::GET {
            CacheStats::record(&self.stats.bypassed);
            return self.inner.send(request).await;
        }

        let key = CacheKey::from_url(request.url());
        let now = (self.clock)();

        match self.storage.read(&key) {
            None => {
                tracing::debug!(key = %key, "cache miss");
                CacheStats::record(&self.stats.misses);
                self.fetch(&key, request).await
            }
            Some(entry) if !self.is_stale(&entry, now) => {
                tracing::debug!(key = %key, "cache hit");
                CacheStats::record(&self.stats.hits);
                Ok(self.serve(&entry, request.url().clone(), STATUS_CACHED))
            }
            Some(entry) => {
                tracing::debug!(key = %key, etag = ?entry.etag(), "cache entry stale");
                self.revalidate(&key, entry, request).await
            }
        }
    }
}
