//! Proxy handler: every request outside the control prefix.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::response::Response;
use precache_client::fetch::{forwardable_response_header, is_hop_by_hop, upstream_url};
use precache_core::request::{HeaderList, RequestDescriptor, ResponseSnapshot};
use tracing::debug;

use crate::app::AppState;
use crate::error::ProxyError;

/// Largest request body read before forwarding.
const MAX_REQUEST_BODY: usize = 10_000_000;

/// Answer a browser request through the runtime.
///
/// The upstream URL is the configured origin plus the incoming path and query.
pub async fn proxy(State(state): State<AppState>, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = upstream_url(&state.origin, path_and_query).map_err(|e| ProxyError::BadRequest(e.to_string()))?;

    let body = to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| ProxyError::BadRequest(format!("failed to read request body: {e}")))?;

    let descriptor = RequestDescriptor::new(parts.method.as_str(), url, forwardable_headers(&parts.headers), body)?;
    let snapshot = state.runtime.fetch(&descriptor).await?;

    debug!(method = %descriptor.method, url = %descriptor.url, status = snapshot.status, "proxied");
    into_response(snapshot)
}

fn forwardable_headers(headers: &HeaderMap) -> HeaderList {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

fn into_response(snapshot: ResponseSnapshot) -> Result<Response, ProxyError> {
    let mut builder = Response::builder().status(snapshot.status);
    for (name, value) in &snapshot.headers {
        if forwardable_response_header(name) {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }

    builder
        .body(Body::from(snapshot.body))
        .map_err(|e| ProxyError::Internal(format!("failed to build response: {e}")))
}
