//! One store round trip before any row is processed, so an unreachable
//! store or rejected credentials abort the run instead of failing every row.

use tracing::info;

use pss_core::{PssError, PssResult};
use pss_io::DocumentStore;

use crate::retry::RetryPolicy;

pub fn verify_store(
    store: &impl DocumentStore,
    collection: &str,
    retry: &RetryPolicy,
) -> PssResult<()> {
    info!(%collection, "checking document store");
    retry
        .run(&format!("ping {collection}"), || store.ping(collection))
        .map_err(|source| PssError::StoreUnavailable {
            collection: collection.to_string(),
            source,
        })
}
