//! A deployable version: generation tags, manifest, and routing settings.

use url::Url;

use crate::Error;
use crate::config::AppConfig;
use crate::request::ResponseSnapshot;

/// Settings for the synthesized response returned to unreachable API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineResponse {
    pub status: u16,
    pub message: String,
}

impl OfflineResponse {
    /// Build the response: fixed status, JSON body `{"error": message}`.
    pub fn to_response(&self) -> ResponseSnapshot {
        let body = serde_json::json!({ "error": self.message }).to_string();
        ResponseSnapshot::new(self.status, vec![("content-type".into(), "application/json".into())], body)
    }
}

impl Default for OfflineResponse {
    fn default() -> Self {
        Self { status: 503, message: "You are offline. Please connect to use the app.".into() }
    }
}

/// Everything one deployment needs to install and serve.
///
/// Changing either tag between deployments is what invalidates the
/// corresponding generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub static_tag: String,
    pub dynamic_tag: String,
    pub origin: Url,
    /// Absolute asset URLs, in manifest order.
    pub manifest: Vec<Url>,
    /// Root document served to offline navigations.
    pub offline_document: Url,
    pub api_prefix: String,
    pub offline_response: OfflineResponse,
}

impl Version {
    /// Build a version for `origin`, resolving manifest paths against it.
    pub fn new(
        origin: Url, static_tag: impl Into<String>, dynamic_tag: impl Into<String>, manifest: &[&str],
    ) -> Result<Self, Error> {
        let manifest = manifest
            .iter()
            .map(|path| resolve(&origin, path))
            .collect::<Result<Vec<_>, _>>()?;
        let offline_document = resolve(&origin, "/index.html")?;

        Ok(Self {
            static_tag: static_tag.into(),
            dynamic_tag: dynamic_tag.into(),
            origin,
            manifest,
            offline_document,
            api_prefix: "/api/".into(),
            offline_response: OfflineResponse::default(),
        })
    }

    /// Build the configured version.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let manifest: Vec<&str> = config.manifest.iter().map(String::as_str).collect();

        let mut version = Self::new(origin, &config.static_tag, &config.dynamic_tag, &manifest)?;
        version.offline_document = resolve(&version.origin, &config.offline_document)?;
        version.api_prefix = config.api_prefix.clone();
        version.offline_response =
            OfflineResponse { status: config.offline_status, message: config.offline_message.clone() };
        Ok(version)
    }

    pub fn with_offline_document(mut self, path: &str) -> Result<Self, Error> {
        self.offline_document = resolve(&self.origin, path)?;
        Ok(self)
    }

    /// Generation tags this version keeps alive on activation.
    pub fn tags(&self) -> [&str; 2] {
        [self.static_tag.as_str(), self.dynamic_tag.as_str()]
    }
}

/// Resolve a manifest entry (absolute path or absolute URL) against the origin.
pub fn resolve(origin: &Url, entry: &str) -> Result<Url, Error> {
    let mut url = origin
        .join(entry)
        .map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
    url.set_fragment(None);
    Ok(url)
}
