use crate::storage::KvStore;
use std::time::Duration;
use tokio::time;

/// Background task that deletes keys whose TTL has passed. Reads already
/// ignore expired rows; this only reclaims space.
pub async fn purge_loop(kv: KvStore, interval_secs: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match kv.purge_expired().await {
            Ok((kv_deleted, index_deleted)) => {
                if kv_deleted > 0 {
                    tracing::info!(deleted = kv_deleted, "purged expired keys");
                }
                if index_deleted > 0 {
                    tracing::info!(deleted = index_deleted, "purged expired dimension index rows");
                }
            }
            Err(e) => tracing::error!(error = %e, "expired key purge failed"),
        }
    }
}
