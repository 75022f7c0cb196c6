//! Network-only executors.

use tracing::{debug, warn};

use crate::Error;
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::transport::Transport;
use crate::version::OfflineResponse;

/// Forward a request untouched. No cache access, no fallback.
pub async fn passthrough(transport: &dyn Transport, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
    debug!(method = %request.method, url = %request.url, "passthrough");
    transport.send(request).await
}

/// Forward an API request; a transport failure becomes the offline response.
///
/// Always yields a response. Error statuses from the origin pass through as-is.
pub async fn network_only_with_fallback(
    transport: &dyn Transport, request: &RequestDescriptor, offline: &OfflineResponse,
) -> ResponseSnapshot {
    match transport.send(request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(url = %request.url, error = %err, status = offline.status, "api request failed; synthesizing response");
            offline.to_response()
        }
    }
}
