//! Cache-or-compute policy.
//!
//! The single place where "is it cached" is decided. Identical requests
//! are served from the store without touching the network; `force`
//! bypasses the read but still writes the fresh record back.

use std::future::Future;

use log::debug;

use stockscope_market_data::{CacheKey, NormalizedRecord};
use stockscope_store::CacheStore;

use crate::errors::CoreError;

/// Resolve `key` to a record. Returns the record and whether it came
/// from the cache.
///
/// `fetch` runs only on a miss (or when forced); its result is committed
/// before this returns, so a subsequent resolve for the same key hits.
pub async fn resolve<F, Fut>(
    store: &CacheStore,
    key: &CacheKey,
    force: bool,
    fetch: F,
) -> Result<(NormalizedRecord, bool), CoreError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<NormalizedRecord, CoreError>>,
{
    if !force {
        if let Some(record) = store.get(key).await? {
            debug!("Cache hit for {}", key.storage_key());
            return Ok((record, true));
        }
    }

    debug!(
        "Cache {} for {}, fetching",
        if force { "bypass" } else { "miss" },
        key.storage_key()
    );
    let record = fetch().await?;
    store.put(key, &record).await?;
    Ok((record, false))
}
