//! Per-version request interceptor.

use std::sync::Arc;

use tracing::debug;

use crate::Error;
use crate::cache::{SharedStore, WriteLease};
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::router::Router;
use crate::scheduler::Revalidator;
use crate::strategy::{Executors, plan};
use crate::transport::SharedTransport;
use crate::version::Version;

/// Routes every request of the version it was built for to an executor.
pub struct Interceptor {
    router: Router,
    executors: Executors,
}

impl Interceptor {
    pub fn new(version: Arc<Version>, store: SharedStore, transport: SharedTransport, revalidator: Revalidator) -> Self {
        let router = Router::new(version.api_prefix.clone());
        Self { router, executors: Executors::new(store, transport, revalidator, version) }
    }

    pub fn version(&self) -> &Version {
        self.executors.version()
    }

    /// Lease covering this version's runtime cache writes.
    pub fn lease(&self) -> &WriteLease {
        self.executors.lease()
    }

    /// Serve one intercepted request.
    pub async fn handle(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let route = self.router.route(request);
        let plan = plan(route, request);
        debug!(method = %request.method, url = %request.url, ?route, "intercepted");
        self.executors.execute(plan, request).await
    }
}
