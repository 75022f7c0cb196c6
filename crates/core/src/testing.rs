//! Test doubles for the transport and store seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::Error;
use crate::cache::{CacheEntry, CacheStore, RequestKey};
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::transport::Transport;

/// Scripted transport: per-URL responses, an offline switch, and a call log.
///
/// Unscripted URLs answer 404. URLs under a hung prefix never answer.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, ResponseSnapshot>>,
    unreachable: Mutex<HashSet<String>>,
    hung: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    /// Make a single URL fail at the transport level.
    pub fn unreachable(&self, url: &str) {
        self.unreachable.lock().unwrap().insert(url.to_string());
    }

    /// Requests whose URL starts with `prefix` stay pending forever.
    pub fn hang(&self, prefix: &str) {
        self.hung.lock().unwrap().push(prefix.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every request sent so far, as `"METHOD url"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(format!("{} {}", request.method, url));

        let hung = self.hung.lock().unwrap().iter().any(|prefix| url.starts_with(prefix.as_str()));
        if hung {
            std::future::pending::<()>().await;
        }

        if self.offline.load(Ordering::SeqCst) || self.unreachable.lock().unwrap().contains(&url) {
            return Err(Error::NetworkUnavailable(format!("connection refused: {url}")));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| ResponseSnapshot::new(404, Vec::new(), "not found")))
    }
}

/// Store decorator whose writes always fail.
pub struct FailingWrites<S> {
    inner: S,
}

impl<S> FailingWrites<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for FailingWrites<S> {
    async fn generations(&self) -> Result<Vec<String>, Error> {
        self.inner.generations().await
    }

    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        self.inner.lookup(generation, key).await
    }

    async fn put(&self, _generation: &str, _entry: CacheEntry) -> Result<(), Error> {
        Err(Error::CacheWrite("disk full".into()))
    }

    async fn commit_generation(&self, _generation: &str, _entries: Vec<CacheEntry>) -> Result<(), Error> {
        Err(Error::CacheWrite("disk full".into()))
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        self.inner.delete_generation(generation).await
    }

    async fn keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error> {
        self.inner.keys(generation).await
    }
}
