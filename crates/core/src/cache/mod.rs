//! Generation-partitioned response cache.
//!
//! A generation is a named collection of [`CacheEntry`] records keyed by
//! [`RequestKey`]. Generations are created by an atomic commit (install) or
//! lazily by the first write (runtime caching) and are only ever destroyed
//! whole. Two backends implement [`CacheStore`]:
//!
//! - [`MemoryStore`]: process-local maps, used by tests and `store = "memory"`
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations

pub mod connection;
pub mod generations;
pub mod key;
pub mod lease;
pub mod memory;
pub mod migrations;

pub use connection::CacheDb;
pub use key::RequestKey;
pub use lease::WriteLease;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Error;
use crate::request::ResponseSnapshot;

/// A stored response for one request key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub response: ResponseSnapshot,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: RequestKey, response: ResponseSnapshot) -> Self {
        Self { key, response, stored_at: Utc::now() }
    }
}

/// Store interface injected into the executors and the lifecycle manager.
///
/// Implementations must make `commit_generation` all-or-nothing and must
/// let concurrent `put`s to the same key resolve as last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Names of every generation currently present.
    async fn generations(&self) -> Result<Vec<String>, Error>;

    async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        Ok(self.generations().await?.iter().any(|g| g == name))
    }

    /// Look up a key in one generation.
    async fn lookup(&self, generation: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error>;

    /// Look up a key across generations in order; the first hit wins.
    async fn lookup_any(&self, generations: &[&str], key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        for generation in generations {
            if let Some(entry) = self.lookup(generation, key).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Insert or overwrite one entry, creating the generation if needed.
    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error>;

    /// Replace (or create) a whole generation in one atomic step.
    async fn commit_generation(&self, generation: &str, entries: Vec<CacheEntry>) -> Result<(), Error>;

    /// Delete a generation and every entry in it.
    ///
    /// Returns whether the generation existed.
    async fn delete_generation(&self, generation: &str) -> Result<bool, Error>;

    /// Keys stored in a generation (empty if it does not exist).
    async fn keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error>;
}

/// Shared handle to an injected store.
pub type SharedStore = Arc<dyn CacheStore>;
