//! Background revalidation task queue.
//!
//! Cache-first hits hand a [`RevalidateJob`] to the [`Revalidator`] instead of
//! spawning work inline. A worker task drains the queue and runs each job as
//! its own detached task, so a slow origin never delays the queue and a
//! caller that goes away never cancels a refresh. Results are only visible
//! through the store, and only while the job's [`WriteLease`] is live.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::cache::{RequestKey, SharedStore, WriteLease};
use crate::request::RequestDescriptor;
use crate::strategy::fetch_and_cache;
use crate::transport::SharedTransport;

/// Refresh one key of a generation from the network.
#[derive(Debug, Clone)]
pub struct RevalidateJob {
    pub request: RequestDescriptor,
    pub key: RequestKey,
    pub generation: String,
    /// Lease of the version that queued the job.
    pub lease: WriteLease,
}

/// Decrements the pending counter when a job finishes, even by panic.
struct PendingGuard(Arc<watch::Sender<usize>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Handle to the revalidation queue.
///
/// Cloning shares the same queue and worker.
#[derive(Clone, Debug)]
pub struct Revalidator {
    tx: mpsc::UnboundedSender<RevalidateJob>,
    pending: Arc<watch::Sender<usize>>,
}

impl Revalidator {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(store: SharedStore, transport: SharedTransport) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<RevalidateJob>();
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);
        let worker_pending = Arc::clone(&pending);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let store = Arc::clone(&store);
                let transport = Arc::clone(&transport);
                let guard = PendingGuard(Arc::clone(&worker_pending));

                tokio::spawn(async move {
                    let _guard = guard;
                    run(&store, &transport, job).await;
                });
            }
            debug!("revalidation queue closed");
        });

        Self { tx, pending }
    }

    /// Queue a job. Never blocks and never fails the caller.
    pub fn enqueue(&self, job: RevalidateJob) {
        self.pending.send_modify(|n| *n += 1);
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            debug!(key = %job.key, "revalidation worker gone; dropping job");
        }
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every queued job has settled.
    pub async fn idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

async fn run(store: &SharedStore, transport: &SharedTransport, job: RevalidateJob) {
    let outcome =
        fetch_and_cache(store.as_ref(), transport.as_ref(), &job.lease, &job.generation, &job.request, &job.key).await;
    match outcome {
        Ok(response) => {
            debug!(key = %job.key, status = response.status, generation = %job.generation, "revalidated");
        }
        Err(err) => {
            debug!(key = %job.key, error = %err, "revalidation failed; cached copy kept");
        }
    }
}
