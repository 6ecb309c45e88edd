// Cached response model.
// Normalized status, body and headers of a successful GET response.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::{
    StatusCode,
    header::{ETAG, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::transport::Response;

/// A stored response.
///
/// Header names are kept lower-case so lookups are case-insensitive.
/// Repeated headers (including `Set-Cookie`) are joined into one
/// comma-separated value, so they do not split back apart on the way out.
/// Values that are not valid UTF-8 are dropped. The body is serialized as
/// base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Status code of the original 2xx response.
    pub status: u16,
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

impl CacheEntry {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Builder-style header setter.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Capture a response. Header values that are not valid UTF-8 are dropped.
    pub fn from_response(response: &Response) -> Self {
        let mut entry = Self::new(response.status.as_u16(), response.body.to_vec());

        for (name, value) in response.headers.iter() {
            let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
                tracing::debug!(header = %name, "dropping non UTF-8 header value");
                continue;
            };
            entry
                .headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        entry
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert or replace a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Revalidation token, if the origin sent one.
    pub fn etag(&self) -> Option<&str> {
        self.header(ETAG.as_str())
    }

    /// Rebuild a pipeline response for `url`.
    pub fn to_response(&self, url: Url) -> Response {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        Response {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(self.body.clone()),
            url,
        }
    }
}

mod base64_body {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::response;

    #[test]
    fn test_from_response() {
        let response = response(
            "http://example.test",
            200,
            &[("Server", "gws"), ("ETag", "\"abc\"")],
            "hello",
        );

        let entry = CacheEntry::from_response(&response);

        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, b"hello");
        assert_eq!(entry.header("server"), Some("gws"));
        assert_eq!(entry.header("SERVER"), Some("gws"));
        assert_eq!(entry.etag(), Some("\"abc\""));
    }

    #[test]
    fn test_repeated_headers_joined() {
        let mut response = response("http://example.test", 200, &[], "");
        response
            .headers
            .append("vary", HeaderValue::from_static("Accept"));
        response
            .headers
            .append("vary", HeaderValue::from_static("Accept-Encoding"));

        let entry = CacheEntry::from_response(&response);
        assert_eq!(entry.header("Vary"), Some("Accept, Accept-Encoding"));
    }

    #[test]
    fn test_set_cookie_values_joined() {
        let mut response = response("http://example.test", 200, &[], "");
        response
            .headers
            .append("set-cookie", HeaderValue::from_static("a=1"));
        response
            .headers
            .append("set-cookie", HeaderValue::from_static("b=2"));

        let entry = CacheEntry::from_response(&response);
        let rebuilt = entry.to_response(response.url.clone());

        assert_eq!(rebuilt.headers.get_all("set-cookie").iter().count(), 1);
        assert_eq!(rebuilt.header("set-cookie"), Some("a=1, b=2"));
    }

    #[test]
    fn test_utf8_header_values_kept() {
        let mut response = response("http://example.test", 200, &[], "");
        response.headers.insert(
            "x-owner",
            HeaderValue::from_bytes("Zoë".as_bytes()).unwrap(),
        );
        response
            .headers
            .insert("x-latin1", HeaderValue::from_bytes(&[0x5a, 0xeb]).unwrap());

        let entry = CacheEntry::from_response(&response);

        assert_eq!(entry.header("x-owner"), Some("Zoë"));
        assert_eq!(entry.header("x-latin1"), None);

        let rebuilt = entry.to_response(response.url.clone());
        assert_eq!(
            rebuilt.headers.get("x-owner").unwrap().as_bytes(),
            "Zoë".as_bytes()
        );
    }

    #[test]
    fn test_body_serialized_as_base64() {
        let entry = CacheEntry::new(200, vec![0u8, 159, 146, 150, 255]);

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""body":"AJ+Slv8=""#));

        let decoded: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_invalid_base64_body_rejected() {
        let json = r#"{"status":200,"body":"not base64!","headers":{}}"#;
        assert!(serde_json::from_str::<CacheEntry>(json).is_err());
    }

    #[test]
    fn test_to_response() {
        let entry = CacheEntry::new(201, "<html>").with_header("Server", "thin");
        let url = Url::parse("http://example.test/page").unwrap();

        let response = entry.to_response(url.clone());

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, Bytes::from_static(b"<html>"));
        assert_eq!(response.header("Server"), Some("thin"));
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.url, url);
    }

    #[test]
    fn test_set_header_replaces_any_case() {
        let mut entry = CacheEntry::new(200, "").with_header("Date", "old");
        entry.set_header("DATE", "new");

        assert_eq!(entry.header("date"), Some("new"));
        assert_eq!(entry.headers.len(), 1);
    }
}
