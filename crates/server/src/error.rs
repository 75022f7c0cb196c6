//! HTTP error responses for the proxy.
//!
//! Every failure renders as `{"error": {"code": ..., "message": ...}}` with a
//! status chosen from the core error kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use precache_core::Error;
use serde_json::json;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Core(#[from] Error),

    /// The incoming request could not be turned into an upstream request.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl ProxyError {
    fn status(&self) -> StatusCode {
        match self {
            ProxyError::Core(err) => match err {
                Error::NetworkUnavailable(_) => StatusCode::BAD_GATEWAY,
                Error::NoActiveVersion => StatusCode::SERVICE_UNAVAILABLE,
                Error::InvalidTransition(_) => StatusCode::CONFLICT,
                Error::ManifestFetch { .. } => StatusCode::FAILED_DEPENDENCY,
                Error::InvalidRequest(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                Error::UnknownNotification(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ProxyError::Core(err) => err.code(),
            ProxyError::BadRequest(_) => "BAD_REQUEST",
            ProxyError::NotFound(_) => "NOT_FOUND",
            ProxyError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = json!({ "error": { "code": self.code(), "message": self.to_string() } });
        (status, Json(body)).into_response()
    }
}
