//! Offline document fallback for navigations.

use tracing::{debug, warn};
use url::Url;

use crate::Error;
use crate::cache::{CacheStore, RequestKey};
use crate::request::ResponseSnapshot;

/// Fetch the root document from the static generation, verbatim.
///
/// `Ok(None)` means the document is not cached and no fallback exists.
pub async fn offline_document_fallback(
    store: &dyn CacheStore, static_tag: &str, document: &Url,
) -> Result<Option<ResponseSnapshot>, Error> {
    let key = RequestKey::get(document);
    match store.lookup(static_tag, &key).await? {
        Some(entry) => {
            debug!(document = %document, generation = static_tag, "serving offline document");
            Ok(Some(entry.response))
        }
        None => {
            warn!(document = %document, generation = static_tag, "offline document missing; no fallback");
            Ok(None)
        }
    }
}
