//! Write lease for one version's runtime cache writes.
//!
//! Every `put` a version makes outside of install (a miss being stored, a
//! background refresh landing) runs while holding its [`WriteLease`]. The
//! lease covers the store write only, never the network round-trip before
//! it. Activation retires the outgoing version's lease before purging: that
//! waits for writes already in progress and refuses every later one, so a
//! straggling response cannot recreate a purged generation.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};

#[derive(Debug, Clone, Default)]
pub struct WriteLease {
    retired: Arc<RwLock<bool>>,
}

impl WriteLease {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the lease for one write. `None` once retired.
    pub async fn acquire(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let guard = self.retired.read().await;
        if *guard { None } else { Some(guard) }
    }

    /// Wait for writes in progress, then refuse all later ones.
    pub async fn retire(&self) {
        *self.retired.write().await = true;
    }

    /// Accept writes again after an activation that did not go through.
    pub async fn reinstate(&self) {
        *self.retired.write().await = false;
    }

    pub async fn is_retired(&self) -> bool {
        *self.retired.read().await
    }
}
