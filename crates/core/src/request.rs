//! Request and response values that cross the interception boundary.
//!
//! The interceptor presents the same contract as an ordinary network call:
//! a [`RequestDescriptor`] goes in, a [`ResponseSnapshot`] comes out.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Ordered list of header name/value pairs.
///
/// Names are kept lowercase; duplicates are allowed and kept in order.
pub type HeaderList = Vec<(String, String)>;

/// An intercepted outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Uppercased HTTP method.
    pub method: String,
    /// Absolute request URL, fragment removed.
    pub url: Url,
    pub headers: HeaderList,
    pub body: Bytes,
    /// Derived from the Accept header: the request loads an HTML document.
    pub navigation: bool,
}

impl RequestDescriptor {
    /// Build a descriptor, normalizing the method and deriving the navigation flag.
    pub fn new(method: &str, mut url: Url, headers: HeaderList, body: Bytes) -> Result<Self, Error> {
        let method = method.trim().to_ascii_uppercase();
        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic() || b == b'-') {
            return Err(Error::InvalidRequest(format!("invalid method: {method:?}")));
        }

        url.set_fragment(None);

        let headers: HeaderList = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        let navigation = headers
            .iter()
            .filter(|(name, _)| name == "accept")
            .any(|(_, value)| value.contains("text/html"));

        Ok(Self { method, url, headers, body, navigation })
    }

    /// A bodyless GET for `url` with no extra headers.
    pub fn get(mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: "GET".into(), url, headers: Vec::new(), body: Bytes::new(), navigation: false }
    }

    /// A GET that asks for an HTML document.
    pub fn navigate(url: Url) -> Self {
        let mut request = Self::get(url);
        request.headers.push(("accept".into(), "text/html,application/xhtml+xml".into()));
        request.navigation = true;
        request
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// First value of a header, by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as handed back to the caller and as stored in a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: HeaderList, body: impl Into<Bytes>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self { status, headers, body: body.into() }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn find_header<'a>(headers: &'a HeaderList, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
