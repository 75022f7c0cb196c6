//! Core types and shared functionality for precache.
//!
//! This crate provides:
//! - Generation-partitioned response cache (SQLite and in-memory backends)
//! - Request routing and the caching strategy executors
//! - Version lifecycle (install, activate) and the runtime controller
//! - Background revalidation queue
//! - Push notification bridge
//! - Unified error types and layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod notify;
pub mod request;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod strategy;
pub mod transport;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheStore, MemoryStore, RequestKey, SharedStore};
pub use config::AppConfig;
pub use error::Error;
pub use request::{RequestDescriptor, ResponseSnapshot};
pub use runtime::Runtime;
pub use transport::{SharedTransport, Transport};
pub use version::Version;
