// GitHub API HTTP client.
// Sends requests through the caching pipeline and converts error statuses.

use std::sync::Arc;

use reqwest::{
    Method, Request, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use url::Url;

use crate::cache::{CacheLayer, Storage};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::logging::LogLayer;
use crate::transport::{ReqwestTransport, Response, Transport};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub API client over an arbitrary transport pipeline.
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    headers: HeaderMap,
}

impl GitHubClient {
    /// Create a client that sends every request through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("reports"));

        Ok(Self {
            transport,
            base_url: api_root(GITHUB_API_BASE)?,
            headers,
        })
    }

    /// Build the default pipeline: caching, then logging, then the network.
    /// Only requests that reach the network are logged.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        let storage = config.build_storage()?;
        let cache = pipeline(ReqwestTransport::new()?, storage, config)?;
        Self::new(Arc::new(cache))
    }

    /// Create a client configured from `REPORTS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::with_config(CacheConfig::load()?)
    }

    /// Point the client at a different API root, e.g. `https://ghe.example.com/api/v3`.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = api_root(base_url)?;
        Ok(self)
    }

    /// Make a GET request to the GitHub API. The response is returned whatever its status.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        // Endpoints are relative to the API root, not the host
        let url = self.base_url.join(endpoint.trim_start_matches('/'))?;
        let mut request = Request::new(Method::GET, url);
        request.headers_mut().extend(self.headers.clone());

        self.transport.send(request).await
    }

    /// Check response status and convert errors.
    pub(crate) fn check_response(&self, response: Response, username: &str) -> Result<Response> {
        match response.status {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(Error::NonexistentUser(username.to_string())),
            status => Err(Error::Status {
                status,
                url: response.url.to_string(),
            }),
        }
    }
}

/// Wrap `network` so cache hits are answered before the logging stage.
fn pipeline<T: Transport>(
    network: T,
    storage: Arc<dyn Storage>,
    config: CacheConfig,
) -> Result<CacheLayer<LogLayer<T>>> {
    CacheLayer::with_config(LogLayer::new(network), storage, config)
}

/// Parse an API root so that relative joins append to its path.
fn api_root(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStorage, STATUS_CACHED};
    use crate::testing::{StubTransport, http_date, response};
    use chrono::Utc;

    #[tokio::test]
    async fn test_get_sets_default_headers() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(response("http://example.test/users/octocat", 200, &[], "{}"));
        let client = GitHubClient::new(stub.clone())
            .unwrap()
            .with_base_url("http://example.test")
            .unwrap();

        client.get("/users/octocat").await.unwrap();

        let requests = stub.requests();
        let sent = &requests[0];
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.url.as_str(), "http://example.test/users/octocat");
        assert_eq!(sent.headers.get(ACCEPT).unwrap(), "application/vnd.github+json");
        assert_eq!(sent.headers.get("x-github-api-version").unwrap(), GITHUB_API_VERSION);
        assert_eq!(sent.headers.get(USER_AGENT).unwrap(), "reports");
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(response("https://ghe.example.com/api/v3/users/octocat", 200, &[], "{}"));
        stub.reply(response("https://ghe.example.com/api/v3/users/octocat/repos", 200, &[], "[]"));
        let client = GitHubClient::new(stub.clone())
            .unwrap()
            .with_base_url("https://ghe.example.com/api/v3")
            .unwrap();

        client.get("/users/octocat").await.unwrap();
        client.get("users/octocat/repos").await.unwrap();

        let requests = stub.requests();
        assert_eq!(
            requests[0].url.as_str(),
            "https://ghe.example.com/api/v3/users/octocat"
        );
        assert_eq!(
            requests[1].url.as_str(),
            "https://ghe.example.com/api/v3/users/octocat/repos"
        );
    }

    #[tokio::test]
    async fn test_pipeline_logs_only_network_requests() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(response(
            "http://example.test/users/octocat",
            200,
            &[("Cache-Control", "max-age=60"), ("Date", &*http_date(Utc::now()))],
            "{}",
        ));
        let storage = Arc::new(MemoryStorage::new());
        let cache: CacheLayer<LogLayer<Arc<StubTransport>>> =
            pipeline(stub.clone(), storage, CacheConfig::default()).unwrap();
        let client = GitHubClient::new(Arc::new(cache))
            .unwrap()
            .with_base_url("http://example.test")
            .unwrap();

        client.get("/users/octocat").await.unwrap();
        let hit = client.get("/users/octocat").await.unwrap();

        assert_eq!(hit.header("x-cache-status"), Some(STATUS_CACHED));
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_api_root_trailing_slash() {
        assert_eq!(
            api_root("https://ghe.example.com/api/v3/").unwrap().as_str(),
            "https://ghe.example.com/api/v3/"
        );
        assert_eq!(
            api_root("http://example.test").unwrap().as_str(),
            "http://example.test/"
        );
    }

    #[test]
    fn test_default_base_url() {
        let client = GitHubClient::new(Arc::new(StubTransport::new())).unwrap();
        assert_eq!(client.base_url.as_str(), "https://api.github.com/");
    }

    #[test]
    fn test_invalid_base_url() {
        let client = GitHubClient::new(Arc::new(StubTransport::new())).unwrap();
        assert!(matches!(
            client.with_base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
