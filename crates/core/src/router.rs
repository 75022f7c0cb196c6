//! Request classification.

use std::fmt;

use crate::request::RequestDescriptor;

/// Routing category that selects the caching algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyClass {
    /// Live traffic under the API prefix: network only, synthesized fallback.
    Api,
    /// Assets: cache first, revalidate in the background.
    Static,
    /// HTML documents: cache first, offline document fallback.
    Navigation,
}

impl fmt::Display for StrategyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyClass::Api => "api",
            StrategyClass::Static => "static",
            StrategyClass::Navigation => "navigation",
        };
        f.write_str(name)
    }
}

/// Outcome of routing an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Non-GET: straight to the network, no cache reads or writes, no fallback.
    Bypass,
    Class(StrategyClass),
}

/// Pure request router.
#[derive(Debug, Clone)]
pub struct Router {
    api_prefix: String,
}

impl Router {
    pub fn new(api_prefix: impl Into<String>) -> Self {
        Self { api_prefix: api_prefix.into() }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Route a request. Non-GET requests never reach [`Router::classify`].
    pub fn route(&self, request: &RequestDescriptor) -> Route {
        if !request.is_get() {
            return Route::Bypass;
        }
        Route::Class(self.classify(request))
    }

    /// Classify a GET request.
    ///
    /// The API prefix wins over the Accept header.
    pub fn classify(&self, request: &RequestDescriptor) -> StrategyClass {
        if request.url.path().starts_with(&self.api_prefix) {
            StrategyClass::Api
        } else if request.navigation {
            StrategyClass::Navigation
        } else {
            StrategyClass::Static
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/api/")
    }
}
