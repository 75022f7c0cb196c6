//! Strategy executors.
//!
//! Routing produces a [`Plan`] (a pure decision over the request); the
//! [`Executors`] carry it out against the injected store and transport.
//!
//! | Route | Plan | Behavior |
//! |---|---|---|
//! | non-GET | `Passthrough` | network only, no cache, errors propagate |
//! | API | `NetworkWithFallback` | network only, synthesized error response on failure |
//! | STATIC | `CacheFirst` | cached copy + background refresh, else fetch and store |
//! | NAVIGATION | `CacheFirst` + offline fallback | as STATIC, root document when offline |
//!
//! No executor holds a lock across the network. Only the store write after a
//! cache-first fetch runs under the version's [`WriteLease`].

mod cache_first;
mod network;
mod offline;

pub(crate) use cache_first::fetch_and_cache;
pub use cache_first::cache_first_with_revalidate;
pub use network::{network_only_with_fallback, passthrough};
pub use offline::offline_document_fallback;

use std::sync::Arc;

use crate::Error;
use crate::cache::{RequestKey, SharedStore, WriteLease};
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::router::{Route, StrategyClass};
use crate::scheduler::Revalidator;
use crate::transport::SharedTransport;
use crate::version::Version;

/// What to do with one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Passthrough,
    NetworkWithFallback,
    CacheFirst { key: RequestKey, offline_fallback: bool },
}

/// Decide how to serve a routed request.
pub fn plan(route: Route, request: &RequestDescriptor) -> Plan {
    match route {
        Route::Bypass => Plan::Passthrough,
        Route::Class(StrategyClass::Api) => Plan::NetworkWithFallback,
        Route::Class(class) => match RequestKey::for_request(request) {
            Some(key) => Plan::CacheFirst { key, offline_fallback: class == StrategyClass::Navigation },
            None => Plan::Passthrough,
        },
    }
}

/// Shared context for every executor of one version.
///
/// Clones share the version's [`WriteLease`].
#[derive(Clone)]
pub struct Executors {
    pub(crate) store: SharedStore,
    pub(crate) transport: SharedTransport,
    pub(crate) revalidator: Revalidator,
    pub(crate) version: Arc<Version>,
    pub(crate) lease: WriteLease,
}

impl Executors {
    pub fn new(store: SharedStore, transport: SharedTransport, revalidator: Revalidator, version: Arc<Version>) -> Self {
        Self { store, transport, revalidator, version, lease: WriteLease::new() }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn lease(&self) -> &WriteLease {
        &self.lease
    }

    /// Carry out a plan.
    pub async fn execute(&self, plan: Plan, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        match plan {
            Plan::Passthrough => passthrough(self.transport.as_ref(), request).await,
            Plan::NetworkWithFallback => {
                Ok(network_only_with_fallback(self.transport.as_ref(), request, &self.version.offline_response).await)
            }
            Plan::CacheFirst { key, offline_fallback } => {
                cache_first_with_revalidate(self, request, key, offline_fallback).await
            }
        }
    }
}
