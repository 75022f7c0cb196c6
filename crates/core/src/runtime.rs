//! The controller: which version serves requests right now.
//!
//! [`Runtime`] owns the store, the transport and the revalidation queue, plus
//! at most one waiting version (installed, not yet activated) and at most one
//! active version. A request only holds the active slot long enough to clone
//! the current [`Interceptor`]; no lock is held across the network.
//!
//! Activation is serialized on the active lifecycle. It retires the outgoing
//! version's [`WriteLease`](crate::cache::WriteLease), which waits for cache
//! writes already in progress and refuses later ones, then purges stale
//! generations and swaps the new interceptor in. Requests the old version
//! still has in flight finish against it but can no longer write.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::Error;
use crate::cache::SharedStore;
use crate::interceptor::Interceptor;
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleManager, Phase};
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::scheduler::Revalidator;
use crate::strategy::passthrough;
use crate::transport::SharedTransport;
use crate::version::Version;

/// The generation tags of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionTags {
    pub static_tag: String,
    pub dynamic_tag: String,
}

impl From<&Version> for VersionTags {
    fn from(version: &Version) -> Self {
        Self { static_tag: version.static_tag.clone(), dynamic_tag: version.dynamic_tag.clone() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub active: Option<VersionTags>,
    pub waiting: Option<VersionTags>,
    pub generations: Vec<String>,
    pub pending_revalidations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub install: InstallReport,
    /// `None` when the version was left waiting.
    pub activation: Option<ActivationReport>,
}

pub struct Runtime {
    store: SharedStore,
    transport: SharedTransport,
    revalidator: Revalidator,
    waiting: Mutex<Option<LifecycleManager>>,
    /// Lifecycle of the active version. Held for the whole of an activation.
    controller: Mutex<Option<LifecycleManager>>,
    active: RwLock<Option<Arc<Interceptor>>>,
    skip_waiting: bool,
}

impl Runtime {
    /// Build a runtime with no version installed. Must be called inside a tokio runtime.
    pub fn new(store: SharedStore, transport: SharedTransport) -> Self {
        let revalidator = Revalidator::spawn(Arc::clone(&store), Arc::clone(&transport));
        Self {
            store,
            transport,
            revalidator,
            waiting: Mutex::new(None),
            controller: Mutex::new(None),
            active: RwLock::new(None),
            skip_waiting: true,
        }
    }

    /// Whether [`Runtime::deploy`] activates right after a successful install.
    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    /// Install `version` and park it as the waiting version.
    ///
    /// The active version keeps serving throughout; on failure nothing changes.
    /// A newer install replaces an older waiting version.
    pub async fn install(&self, version: Version) -> Result<InstallReport, Error> {
        let mut lifecycle =
            LifecycleManager::new(Arc::new(version), Arc::clone(&self.store), Arc::clone(&self.transport));
        let report = lifecycle.install().await?;

        let mut waiting = self.waiting.lock().await;
        if let Some(previous) = waiting.replace(lifecycle) {
            debug!(static_tag = %previous.version().static_tag, "superseded waiting version");
        }
        Ok(report)
    }

    /// Activate the waiting version, or re-run the purge for the active one.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut controller = self.controller.lock().await;
        let pending = self.waiting.lock().await.take();

        let Some(mut lifecycle) = pending else {
            return match controller.as_mut() {
                Some(current) => current.activate().await,
                None => Err(Error::NoActiveVersion),
            };
        };

        let outgoing = self.current().await;
        if let Some(outgoing) = &outgoing {
            outgoing.lease().retire().await;
        }

        match lifecycle.activate().await {
            Ok(report) => {
                let interceptor = Interceptor::new(
                    Arc::clone(lifecycle.version()),
                    Arc::clone(&self.store),
                    Arc::clone(&self.transport),
                    self.revalidator.clone(),
                );
                *self.active.write().await = Some(Arc::new(interceptor));
                *controller = Some(lifecycle);
                info!(static_tag = %report.static_tag, dynamic_tag = %report.dynamic_tag, "now controlling requests");
                Ok(report)
            }
            Err(err) => {
                if let Some(outgoing) = &outgoing {
                    outgoing.lease().reinstate().await;
                }
                let mut waiting = self.waiting.lock().await;
                if waiting.is_none() {
                    *waiting = Some(lifecycle);
                } else {
                    warn!(static_tag = %lifecycle.version().static_tag, "activation failed after a newer install");
                }
                Err(err)
            }
        }
    }

    /// Install, then activate unless configured to wait.
    pub async fn deploy(&self, version: Version) -> Result<DeployReport, Error> {
        let install = self.install(version).await?;
        let activation = if self.skip_waiting { Some(self.activate().await?) } else { None };
        Ok(DeployReport { install, activation })
    }

    /// Answer a request through the active version, or straight from the
    /// network when nothing is active yet.
    pub async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        match self.current().await {
            Some(interceptor) => interceptor.handle(request).await,
            None => passthrough(self.transport.as_ref(), request).await,
        }
    }

    async fn current(&self) -> Option<Arc<Interceptor>> {
        self.active.read().await.clone()
    }

    pub async fn status(&self) -> Result<RuntimeStatus, Error> {
        let waiting = self.waiting.lock().await.as_ref().map(|lifecycle| {
            let version: &Version = lifecycle.version();
            VersionTags::from(version)
        });
        let active = self.current().await.map(|interceptor| VersionTags::from(interceptor.version()));

        Ok(RuntimeStatus {
            active,
            waiting,
            generations: self.store.generations().await?,
            pending_revalidations: self.revalidator.pending(),
        })
    }

    /// Phase of the active version, if any.
    pub async fn active_phase(&self) -> Option<Phase> {
        self.controller.lock().await.as_ref().map(LifecycleManager::phase)
    }

    /// Wait for queued background refreshes to settle.
    pub async fn idle(&self) {
        self.revalidator.idle().await;
    }
}
