//! Client code for precache.
//!
//! This crate provides the reqwest-backed transport to the origin, plus the
//! URL and header handling shared with the proxy server.

pub mod fetch;

pub use fetch::{FetchConfig, HttpTransport, UrlError, canonicalize, upstream_url};
