//! Normalized request identity used as the cache key.

use sha2::{Digest, Sha256};
use url::Url;

use crate::request::RequestDescriptor;

/// Cache key: method plus absolute URL with the fragment stripped.
///
/// Only GET requests can produce a key, so a non-GET request can never be
/// stored or looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    /// Key for a GET of `url`.
    pub fn get(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: "GET".into(), url: url.into() }
    }

    /// Key for an intercepted request, or `None` when it is not a GET.
    pub fn for_request(request: &RequestDescriptor) -> Option<Self> {
        request.is_get().then(|| Self::get(&request.url))
    }

    /// Rebuild a key read back from storage.
    pub(crate) fn from_stored(method: String, url: String) -> Self {
        Self { method, url }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// SHA-256 hex digest of the key, used as the storage primary key.
    pub fn digest(&self) -> String {
        compute_key_hash(&self.method, &self.url)
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Compute the storage hash for a (method, url) pair.
pub fn compute_key_hash(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
