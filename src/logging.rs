// Logging setup and request logging stage.
// Installs the tracing subscriber and logs each request's outcome and duration.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Request;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::transport::{Response, Transport};

/// Install a fmt subscriber filtered by `LOG_LEVEL`, then `RUST_LOG`, then `warn`.
///
/// Does nothing if a global subscriber is already set.
pub fn init() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Stage that logs `-> <url> <METHOD> <status> (<secs> s)` for every request.
pub struct LogLayer<T> {
    inner: T,
}

impl<T: Transport> LogLayer<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for LogLayer<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        let start = Instant::now();
        let method = request.method().clone();
        let url = request.url().clone();

        let result = self.inner.send(request).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(response) => tracing::debug!(
                "-> {} {} {} ({:.3} s)",
                url,
                method,
                response.status.as_u16(),
                elapsed
            ),
            Err(e) => tracing::debug!("-> {} {} failed: {} ({:.3} s)", url, method, e, elapsed),
        }

        result
    }
}
