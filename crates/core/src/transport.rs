//! Network seam used by the executors and the lifecycle manager.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::request::{RequestDescriptor, ResponseSnapshot};

/// Sends a request to the network.
///
/// Implementations report every transport-level failure as
/// [`Error::NetworkUnavailable`]. A response with an error status is still a
/// successful send. No timeout is layered on top of the transport's own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error>;
}

/// Shared handle to an injected transport.
pub type SharedTransport = Arc<dyn Transport>;
