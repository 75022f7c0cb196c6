//! Cache-first with background revalidation.

use tracing::{debug, warn};

use super::{Executors, offline_document_fallback};
use crate::Error;
use crate::cache::{CacheEntry, CacheStore, RequestKey, WriteLease};
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::scheduler::RevalidateJob;
use crate::transport::Transport;

/// Fetch from the network and store a 2xx response in `generation`.
///
/// A failed write is logged and discarded; the fetched response is returned
/// regardless. Non-2xx responses are returned without being stored, and so
/// is everything fetched after `lease` was retired.
pub(crate) async fn fetch_and_cache(
    store: &dyn CacheStore, transport: &dyn Transport, lease: &WriteLease, generation: &str,
    request: &RequestDescriptor, key: &RequestKey,
) -> Result<ResponseSnapshot, Error> {
    let response = transport.send(request).await?;

    if response.is_ok() {
        let Some(_held) = lease.acquire().await else {
            debug!(key = %key, generation, "version retired; response not stored");
            return Ok(response);
        };
        let entry = CacheEntry::new(key.clone(), response.clone());
        if let Err(err) = store.put(generation, entry).await {
            let err = match err {
                Error::CacheWrite(_) => err,
                other => Error::CacheWrite(other.to_string()),
            };
            warn!(key = %key, generation, error = %err, "discarding failed cache write");
        }
    }

    Ok(response)
}

/// Serve from cache when possible, refreshing the dynamic copy in the background.
///
/// On a miss the request is fetched and stored before returning. When the
/// fetch fails with a network error and `offline_fallback` is set, the
/// static generation's root document is returned instead; if that is not
/// cached either, the network error propagates.
pub async fn cache_first_with_revalidate(
    ctx: &Executors, request: &RequestDescriptor, key: RequestKey, offline_fallback: bool,
) -> Result<ResponseSnapshot, Error> {
    let version = ctx.version();
    let generations = [version.dynamic_tag.as_str(), version.static_tag.as_str()];

    match ctx.store.lookup_any(&generations, &key).await {
        Ok(Some(entry)) => {
            debug!(key = %key, outcome = "hit", "cache-first");
            ctx.revalidator.enqueue(RevalidateJob {
                request: request.clone(),
                key,
                generation: version.dynamic_tag.clone(),
                lease: ctx.lease.clone(),
            });
            return Ok(entry.response);
        }
        Ok(None) => debug!(key = %key, outcome = "miss", "cache-first"),
        Err(err) => warn!(key = %key, error = %err, "cache lookup failed; treating as miss"),
    }

    let fetched =
        fetch_and_cache(ctx.store.as_ref(), ctx.transport.as_ref(), &ctx.lease, &version.dynamic_tag, request, &key)
            .await;

    match fetched {
        Err(err) if offline_fallback && err.is_network() => {
            match offline_document_fallback(ctx.store.as_ref(), &version.static_tag, &version.offline_document).await {
                Ok(Some(document)) => Ok(document),
                Ok(None) => Err(err),
                Err(lookup_err) => {
                    warn!(error = %lookup_err, "offline document lookup failed");
                    Err(err)
                }
            }
        }
        other => other,
    }
}
