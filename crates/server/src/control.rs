//! Control routes under `/_precache/`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use precache_core::lifecycle::ActivationReport;
use precache_core::notify::{ClickAction, NotificationDescriptor, WindowClient};
use precache_core::runtime::{DeployReport, RuntimeStatus};
use precache_core::version::resolve;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ProxyError;
use crate::notify::ShownNotification;

pub async fn status(State(state): State<AppState>) -> Result<Json<RuntimeStatus>, ProxyError> {
    Ok(Json(state.runtime.status().await?))
}

/// Install the configured version; activates too unless the runtime waits.
pub async fn install(State(state): State<AppState>) -> Result<Json<DeployReport>, ProxyError> {
    let version = state.version.as_ref().clone();
    Ok(Json(state.runtime.deploy(version).await?))
}

pub async fn activate(State(state): State<AppState>) -> Result<Json<ActivationReport>, ProxyError> {
    Ok(Json(state.runtime.activate().await?))
}

/// Deliver a push; the raw body is the payload.
pub async fn push(State(state): State<AppState>, body: Bytes) -> Result<Json<NotificationDescriptor>, ProxyError> {
    Ok(Json(state.bridge.on_push(Some(&body)).await?))
}

pub async fn notifications(State(state): State<AppState>) -> Json<Vec<ShownNotification>> {
    Json(state.notifications.list().await)
}

/// Unknown or evicted ids come back as 404 from the bridge itself.
pub async fn click(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<ClickAction>, ProxyError> {
    Ok(Json(state.bridge.on_click(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RegisterWindow {
    /// Absolute URL, or a path on the origin.
    pub url: String,
}

pub async fn register_window(
    State(state): State<AppState>, Json(params): Json<RegisterWindow>,
) -> Result<(StatusCode, Json<WindowClient>), ProxyError> {
    let url = resolve(&state.origin, &params.url)?;
    Ok((StatusCode::CREATED, Json(state.windows.register(url).await)))
}

pub async fn not_found(Path(rest): Path<String>) -> ProxyError {
    ProxyError::NotFound(format!("no control route /_precache/{rest}"))
}
