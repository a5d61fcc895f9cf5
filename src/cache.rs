use crate::error::{AppError, AppResult};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use moka::sync::Cache;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Short-lived cache of rendered query responses, keyed on the normalised
/// query (e.g. `"stats:week:all"`). Stores serialized JSON strings.
pub struct QueryCache {
    inner: Cache<String, String>,
}

impl QueryCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(Duration::from_secs(ttl_secs))
                .max_capacity(256)
                .build(),
        }
    }

    /// `None` when caching is disabled (`ttl_secs == 0`).
    pub fn from_ttl(ttl_secs: u64) -> Option<Self> {
        (ttl_secs > 0).then(|| Self::new(ttl_secs))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value);
    }
}

/// Serve `key` from the cache, or compute, store and return it.
///
/// The body is kept as serialized text so object key order chosen by the
/// `Serialize` impl (e.g. ranked counts) reaches the client unchanged.
pub async fn cached_or_compute<T, F, Fut>(
    cache: Option<&QueryCache>,
    key: String,
    compute: F,
) -> AppResult<Response>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    if let Some(cached) = cache.and_then(|c| c.get(&key)) {
        tracing::debug!(key = %key, "query cache hit");
        return Ok(json_response(cached));
    }

    let result = compute().await?;
    let body =
        serde_json::to_string(&result).map_err(AppError::internal("Failed to encode response"))?;
    if let Some(cache) = cache {
        cache.insert(key, body.clone());
    }
    Ok(json_response(body))
}

fn json_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
