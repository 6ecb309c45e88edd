// Cache key construction.
// Canonicalizes request URLs so equivalent GET requests share one entry.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

use crate::error::Result;

/// Canonical absolute URL identifying a cached GET resource.
///
/// Scheme and host are lower-cased, default ports dropped and an empty path
/// becomes `/` (all done by the URL parser). The fragment is removed since it
/// is never sent to the origin. The query string is kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    /// Parse and canonicalize a URL string.
    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::from_url(&Url::parse(url)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the key, safe for use as a file name.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
