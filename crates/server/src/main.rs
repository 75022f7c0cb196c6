//! precache proxy entry point.
//!
//! Boots an HTTP reverse proxy in front of the configured origin. Requests
//! are answered through the runtime's caching strategies; control routes
//! live under `/_precache/`. Logging goes to stderr.

use std::sync::Arc;

use anyhow::Result;
use precache_client::{FetchConfig, HttpTransport, canonicalize};
use precache_core::config::{AppConfig, LogFormat, StoreBackend};
use precache_core::{CacheDb, MemoryStore, Runtime, SharedStore, Version};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod control;
mod error;
mod handler;
mod notify;

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = AppConfig::load()?;
    init_tracing(config.log_format);

    config.origin = canonicalize(&config.origin)?.to_string();
    info!(origin = %config.origin, listen_addr = %config.listen_addr, "starting precache proxy");

    let store: SharedStore = match config.store {
        StoreBackend::Sqlite => Arc::new(CacheDb::open(&config.db_path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    let transport = Arc::new(HttpTransport::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_redirects: config.max_redirects,
    })?);

    let version = Version::from_config(&config)?;
    let runtime = Arc::new(Runtime::new(store, transport).with_skip_waiting(config.skip_waiting));

    match runtime.deploy(version.clone()).await {
        Ok(report) => info!(
            static_tag = %report.install.static_tag,
            assets = report.install.assets,
            activated = report.activation.is_some(),
            "initial deploy complete"
        ),
        Err(err) => warn!(error = %err, "initial install failed; proxying uncontrolled"),
    }

    let state = app::AppState::new(runtime, version, config.notification.clone())?;
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
