//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRECACHE_*)
//! 2. TOML config file (if PRECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which [`crate::cache::CacheStore`] backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

/// Push notification presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_app_name")]
    pub title: String,

    /// Body used when a push arrives without a payload.
    #[serde(default = "default_notification_body")]
    pub default_body: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_icon")]
    pub badge: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    /// Path opened when a notification is clicked and no window exists.
    #[serde(default = "default_start_url")]
    pub start_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_app_name(),
            default_body: default_notification_body(),
            icon: default_icon(),
            badge: default_icon(),
            vibrate: default_vibrate(),
            start_url: default_start_url(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRECACHE_*, nested keys split on `__`)
/// 2. TOML config file (if PRECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream origin every proxied request is sent to.
    ///
    /// Set via PRECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the proxy listens on.
    ///
    /// Set via PRECACHE_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Cache store backend.
    #[serde(default = "default_store")]
    pub store: StoreBackend,

    /// Path to SQLite cache database (used when `store = "sqlite"`).
    ///
    /// Set via PRECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version tag of the static (install-time) generation.
    #[serde(default = "default_static_tag")]
    pub static_tag: String,

    /// Version tag of the dynamic (runtime) generation.
    #[serde(default = "default_dynamic_tag")]
    pub dynamic_tag: String,

    /// Assets fetched and committed by install, in order.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Root document served to navigations when the network is down.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Path prefix of live API traffic that is never cached.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Status of the synthesized response for unreachable API calls.
    #[serde(default = "default_offline_status")]
    pub offline_status: u16,

    /// Message carried in the synthesized API error body.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Activate a freshly installed version immediately.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Default User-Agent for upstream requests without one.
    ///
    /// Set via PRECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of redirects the transport follows.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default)]
    pub notification: NotificationConfig,
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_store() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./precache.sqlite")
}

fn default_static_tag() -> String {
    "static-v1".into()
}

fn default_dynamic_tag() -> String {
    "dynamic-v1".into()
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/css/styles.css", "/js/app.js", "/manifest.json", "/icons/icon.svg"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_document() -> String {
    "/index.html".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_offline_status() -> u16 {
    503
}

fn default_offline_message() -> String {
    "You are offline. Please connect to use the app.".into()
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "precache/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_app_name() -> String {
    "Smart Grocery Cart".into()
}

fn default_notification_body() -> String {
    "New notification from Smart Grocery Cart".into()
}

fn default_icon() -> String {
    "/icons/icon.svg".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_start_url() -> String {
    "/".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            store: default_store(),
            db_path: default_db_path(),
            static_tag: default_static_tag(),
            dynamic_tag: default_dynamic_tag(),
            manifest: default_manifest(),
            offline_document: default_offline_document(),
            api_prefix: default_api_prefix(),
            offline_status: default_offline_status(),
            offline_message: default_offline_message(),
            skip_waiting: true,
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            log_format: default_log_format(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("PRECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}
