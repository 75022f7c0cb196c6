//! Version lifecycle: install, then activate.
//!
//! Each deployed version gets its own [`LifecycleManager`], starting in
//! [`Phase::Installing`]. Transitions go through named guards on [`Phase`];
//! the work for each step is first planned by a pure function
//! ([`plan_install`], [`plan_activation`]) and then executed against the
//! injected store and transport.
//!
//! ```text
//! Installing --install ok--> WaitingToActivate --purge done--> Active
//!     |
//!     +--install failed--> Redundant
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::Error;
use crate::cache::{CacheEntry, RequestKey, SharedStore};
use crate::request::RequestDescriptor;
use crate::transport::SharedTransport;
use crate::version::Version;

/// Lifecycle phase of one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Installing,
    WaitingToActivate,
    Active,
    /// Install failed; this version will never serve.
    Redundant,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Installing => "installing",
            Phase::WaitingToActivate => "waiting_to_activate",
            Phase::Active => "active",
            Phase::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

impl Phase {
    pub fn can_install(self) -> bool {
        self == Phase::Installing
    }

    /// Activation is allowed once installed, and again once active (no-op purge).
    pub fn can_activate(self) -> bool {
        matches!(self, Phase::WaitingToActivate | Phase::Active)
    }

    pub fn installed(self) -> Result<Phase, Error> {
        if self.can_install() {
            Ok(Phase::WaitingToActivate)
        } else {
            Err(Error::InvalidTransition(format!("cannot finish install from {self}")))
        }
    }

    pub fn install_failed(self) -> Result<Phase, Error> {
        if self.can_install() {
            Ok(Phase::Redundant)
        } else {
            Err(Error::InvalidTransition(format!("cannot fail install from {self}")))
        }
    }

    pub fn activated(self) -> Result<Phase, Error> {
        if self.can_activate() {
            Ok(Phase::Active)
        } else {
            Err(Error::InvalidTransition(format!("cannot activate from {self}")))
        }
    }
}

/// Requests install must complete, and where their responses go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub generation: String,
    pub requests: Vec<RequestDescriptor>,
}

/// Build the install plan: one GET per manifest asset, in manifest order.
pub fn plan_install(version: &Version) -> InstallPlan {
    InstallPlan {
        generation: version.static_tag.clone(),
        requests: version.manifest.iter().cloned().map(RequestDescriptor::get).collect(),
    }
}

/// Generations to delete on activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPlan {
    pub delete: Vec<String>,
}

/// Every existing generation whose name is not one of the version's tags.
pub fn plan_activation(existing: &[String], version: &Version) -> ActivationPlan {
    let keep = version.tags();
    ActivationPlan {
        delete: existing
            .iter()
            .filter(|name| !keep.contains(&name.as_str()))
            .cloned()
            .collect(),
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub static_tag: String,
    pub assets: usize,
}

/// Outcome of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub static_tag: String,
    pub dynamic_tag: String,
    pub deleted: Vec<String>,
}

/// Drives one version through install and activation.
pub struct LifecycleManager {
    version: Arc<Version>,
    phase: Phase,
    store: SharedStore,
    transport: SharedTransport,
}

impl LifecycleManager {
    pub fn new(version: Arc<Version>, store: SharedStore, transport: SharedTransport) -> Self {
        Self { version, phase: Phase::Installing, store, transport }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn version(&self) -> &Arc<Version> {
        &self.version
    }

    /// Fetch every manifest asset and commit them as the static generation.
    ///
    /// All or nothing: the generation is only written once every asset came
    /// back with a 2xx status. Any failure moves this version to
    /// [`Phase::Redundant`] and leaves the store untouched.
    pub async fn install(&mut self) -> Result<InstallReport, Error> {
        if !self.phase.can_install() {
            return Err(Error::InvalidTransition(format!("install called in phase {}", self.phase)));
        }
        info!(static_tag = %self.version.static_tag, assets = self.version.manifest.len(), "installing");

        match self.fetch_and_commit().await {
            Ok(report) => {
                self.phase = self.phase.installed()?;
                info!(static_tag = %report.static_tag, assets = report.assets, "installed; waiting to activate");
                Ok(report)
            }
            Err(err) => {
                self.phase = self.phase.install_failed()?;
                warn!(static_tag = %self.version.static_tag, error = %err, "install failed");
                Err(err)
            }
        }
    }

    async fn fetch_and_commit(&self) -> Result<InstallReport, Error> {
        let plan = plan_install(&self.version);
        let mut entries = Vec::with_capacity(plan.requests.len());

        for request in &plan.requests {
            let response = self
                .transport
                .send(request)
                .await
                .map_err(|e| Error::ManifestFetch { url: request.url.to_string(), reason: e.to_string() })?;

            if !response.is_ok() {
                return Err(Error::ManifestFetch {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }

            entries.push(CacheEntry::new(RequestKey::get(&request.url), response));
        }

        let assets = entries.len();
        self.store.commit_generation(&plan.generation, entries).await?;

        Ok(InstallReport { static_tag: plan.generation, assets })
    }

    /// Delete every generation that does not belong to this version.
    ///
    /// Completes the whole purge before returning; calling it again once
    /// active deletes nothing.
    pub async fn activate(&mut self) -> Result<ActivationReport, Error> {
        if !self.phase.can_activate() {
            return Err(Error::InvalidTransition(format!("activate called in phase {}", self.phase)));
        }

        let existing = self.store.generations().await?;
        let plan = plan_activation(&existing, &self.version);

        let mut deleted = Vec::with_capacity(plan.delete.len());
        for name in plan.delete {
            if self.store.delete_generation(&name).await? {
                info!(generation = %name, "deleted stale generation");
                deleted.push(name);
            }
        }

        self.phase = self.phase.activated()?;
        info!(
            static_tag = %self.version.static_tag,
            dynamic_tag = %self.version.dynamic_tag,
            deleted = deleted.len(),
            "activated"
        );

        Ok(ActivationReport {
            static_tag: self.version.static_tag.clone(),
            dynamic_tag: self.version.dynamic_tag.clone(),
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryStore};
    use crate::request::ResponseSnapshot;
    use crate::testing::{FailingWrites, FakeTransport};
    use url::Url;

    const MANIFEST: &[&str] = &["/", "/index.html", "/css/styles.css", "/js/app.js"];

    fn version(static_tag: &str, dynamic_tag: &str) -> Arc<Version> {
        Arc::new(Version::new(Url::parse("http://origin").unwrap(), static_tag, dynamic_tag, MANIFEST).unwrap())
    }

    fn serving_transport() -> Arc<FakeTransport> {
        let transport = FakeTransport::new();
        for path in MANIFEST {
            transport.respond(&format!("http://origin{path}"), ResponseSnapshot::new(200, Vec::new(), *path));
        }
        Arc::new(transport)
    }

    #[test]
    fn test_phase_guards() {
        assert_eq!(Phase::Installing.installed().unwrap(), Phase::WaitingToActivate);
        assert_eq!(Phase::Installing.install_failed().unwrap(), Phase::Redundant);
        assert_eq!(Phase::WaitingToActivate.activated().unwrap(), Phase::Active);
        assert_eq!(Phase::Active.activated().unwrap(), Phase::Active);
        assert!(Phase::Installing.activated().is_err());
        assert!(Phase::Redundant.activated().is_err());
        assert!(Phase::Active.installed().is_err());
    }

    #[test]
    fn test_plan_install_follows_manifest_order() {
        let plan = plan_install(&version("static-v1", "dynamic-v1"));
        assert_eq!(plan.generation, "static-v1");
        let urls: Vec<&str> = plan.requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["http://origin/", "http://origin/index.html", "http://origin/css/styles.css", "http://origin/js/app.js"]
        );
        assert!(plan.requests.iter().all(RequestDescriptor::is_get));
    }

    #[test]
    fn test_plan_activation_keeps_current_tags() {
        let existing: Vec<String> = ["dynamic-v1", "smart-grocery-cart-v1", "static-v1", "static-v2"]
            .into_iter()
            .map(String::from)
            .collect();
        let plan = plan_activation(&existing, &version("static-v2", "dynamic-v1"));
        assert_eq!(plan.delete, vec!["smart-grocery-cart-v1".to_string(), "static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_install_commits_every_asset() {
        let store = Arc::new(MemoryStore::new());
        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store.clone(), serving_transport());

        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.assets, MANIFEST.len());
        assert_eq!(lifecycle.phase(), Phase::WaitingToActivate);
        assert_eq!(store.keys("static-v1").await.unwrap().len(), MANIFEST.len());
    }

    #[tokio::test]
    async fn test_install_unreachable_asset_commits_nothing() {
        let store = Arc::new(MemoryStore::new());
        let transport = serving_transport();
        transport.unreachable("http://origin/css/styles.css");
        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store.clone(), transport);

        let result = lifecycle.install().await;

        assert!(matches!(result, Err(Error::ManifestFetch { ref url, .. }) if url == "http://origin/css/styles.css"));
        assert_eq!(lifecycle.phase(), Phase::Redundant);
        assert!(store.generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_error_status_is_manifest_failure() {
        let store = Arc::new(MemoryStore::new());
        let transport = serving_transport();
        transport.respond("http://origin/js/app.js", ResponseSnapshot::new(500, Vec::new(), "oops"));
        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store.clone(), transport);

        let err = lifecycle.install().await.unwrap_err();
        assert!(err.to_string().contains("status 500"));
        assert!(!store.has_generation("static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_install_commit_failure_is_fatal() {
        let store = Arc::new(FailingWrites::new(MemoryStore::new()));
        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store, serving_transport());

        assert!(matches!(lifecycle.install().await, Err(Error::CacheWrite(_))));
        assert_eq!(lifecycle.phase(), Phase::Redundant);
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store, serving_transport());
        lifecycle.install().await.unwrap();
        assert!(matches!(lifecycle.install().await, Err(Error::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_activate_before_install_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store, serving_transport());
        assert!(matches!(lifecycle.activate().await, Err(Error::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_activate_purges_stale_generations_and_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let stale = CacheEntry::new(
            RequestKey::get(&Url::parse("http://origin/old.js").unwrap()),
            ResponseSnapshot::new(200, Vec::new(), "old"),
        );
        store.put("static-v0", stale.clone()).await.unwrap();
        store.put("dynamic-v0", stale.clone()).await.unwrap();
        store.put("dynamic-v1", stale).await.unwrap();

        let mut lifecycle = LifecycleManager::new(version("static-v1", "dynamic-v1"), store.clone(), serving_transport());
        lifecycle.install().await.unwrap();

        let report = lifecycle.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["dynamic-v0".to_string(), "static-v0".to_string()]);
        assert_eq!(lifecycle.phase(), Phase::Active);
        assert_eq!(store.generations().await.unwrap(), vec!["dynamic-v1".to_string(), "static-v1".to_string()]);

        let before = store.generations().await.unwrap();
        let again = lifecycle.activate().await.unwrap();
        assert!(again.deleted.is_empty());
        assert_eq!(store.generations().await.unwrap(), before);
        assert_eq!(store.keys("static-v1").await.unwrap().len(), MANIFEST.len());
    }
}
