//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - either version tag is empty, or both tags are equal
    /// - `manifest` is empty or has an entry that is neither `/path` nor an http(s) URL
    /// - `api_prefix` does not start with `/`
    /// - `offline_status` is outside 400..=599
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if the origin is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.origin.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "origin".into(),
                hint: "Set PRECACHE_ORIGIN to the upstream application URL".into(),
            });
        }
        if !is_http_url(&self.origin) {
            return Err(invalid("origin", "must be an absolute http(s) URL"));
        }

        if self.static_tag.trim().is_empty() {
            return Err(invalid("static_tag", "must not be empty"));
        }
        if self.dynamic_tag.trim().is_empty() {
            return Err(invalid("dynamic_tag", "must not be empty"));
        }
        if self.static_tag == self.dynamic_tag {
            return Err(invalid("dynamic_tag", "must differ from static_tag"));
        }

        if self.manifest.is_empty() {
            return Err(invalid("manifest", "must list at least one asset"));
        }
        if let Some(bad) = self
            .manifest
            .iter()
            .find(|entry| !entry.starts_with('/') && !is_http_url(entry))
        {
            return Err(invalid("manifest", format!("{bad:?} is not an absolute path or http(s) URL")));
        }

        if !self.offline_document.starts_with('/') {
            return Err(invalid("offline_document", "must be an absolute path"));
        }

        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }

        if !(400..=599).contains(&self.offline_status) {
            return Err(invalid("offline_status", "must be an HTTP error status (400-599)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.notification.start_url.starts_with('/') {
            return Err(invalid("notification.start_url", "must be an absolute path"));
        }

        if !self.manifest.contains(&self.offline_document) {
            tracing::warn!(
                offline_document = %self.offline_document,
                "offline_document is not in the manifest; \
                 offline navigations will have no fallback"
            );
        }

        Ok(())
    }
}
