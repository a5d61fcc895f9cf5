//! Shared state and the HTTP router.

use crate::cache::QueryCache;
use crate::config::{AppConfig, DownloadsConfig, StorageConfig};
use crate::counter::Counters;
use crate::error::{AppError, AppResult};
use crate::gallery::store::GalleryStore;
use crate::storage::{self, KvStore, StoreError};
use crate::{analytics, download, gallery};
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;
const CORS_MAX_AGE: Duration = Duration::from_secs(86400);

/// Handles onto the backing store.
#[derive(Clone)]
pub struct Storage {
    pub kv: KvStore,
    pub counters: Counters,
    pub gallery: GalleryStore,
}

impl Storage {
    /// Open the database, apply migrations and build the store handles.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let pool = storage::sqlite::create_pool(config)?;
        storage::sqlite::init_pool(&pool).await?;

        let kv = KvStore::new(pool.clone());
        Ok(Self {
            counters: Counters::new(kv.clone()),
            gallery: GalleryStore::new(pool),
            kv,
        })
    }
}

pub struct AppState {
    /// `None` when storage is disabled: write endpoints no-op, reads answer 503.
    pub storage: Option<Storage>,
    pub downloads: DownloadsConfig,
    pub admin_api_key: String,
    pub environment: String,
    pub cache: Option<QueryCache>,
}

impl AppState {
    /// Build state from config, opening and seeding the store when enabled.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let storage = if config.storage.enabled {
            let storage = Storage::open(&config.storage).await?;
            if config.gallery.seed_samples {
                let seeded = storage.gallery.seed_if_empty(&gallery::seed::samples()).await?;
                if seeded > 0 {
                    tracing::info!(items = seeded, "seeded gallery with sample tracks");
                }
            }
            Some(storage)
        } else {
            tracing::warn!("storage disabled: counters will not be recorded");
            None
        };

        Ok(Self {
            storage,
            downloads: config.downloads.clone(),
            admin_api_key: config.gallery.admin_api_key.clone(),
            environment: config.server.environment.clone(),
            cache: QueryCache::from_ttl(config.query.cache_ttl_secs),
        })
    }

    /// Store handle for read paths, which have nothing to serve without one.
    pub fn require_storage(&self) -> AppResult<&Storage> {
        self.storage.as_ref().ok_or(AppError::StorageUnavailable)
    }
}

/// Assemble every `/api` route with CORS and the preflight short-circuit.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE);

    Router::new()
        .route("/api", get(api_index))
        .route("/api/", get(api_index))
        .route("/api/health", get(health))
        .route(
            "/api/analytics",
            get(analytics::handler::query_analytics).post(analytics::handler::record_event),
        )
        .route(
            "/api/download",
            get(download::handler::download_redirect).post(download::handler::record_download),
        )
        .route("/api/stats", get(download::handler::download_stats))
        .route("/api/download-stats", get(download::handler::download_stats))
        .route(
            "/api/gallery",
            get(gallery::handler::list_gallery).post(gallery::handler::add_gallery_item),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(middleware::from_fn(preflight))
        .with_state(state)
}

/// Answer every OPTIONS request with 204 and the CORS headers, whether or
/// not the browser sent a full preflight.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "environment": state.environment,
    }))
}

/// GET /api - endpoint index.
pub async fn api_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "MuLa Music Studio API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/download": "Record download and redirect to file",
            "GET /api/download?os=<os>": "Redirect to download file",
            "GET /api/stats": "Get download statistics",
            "GET /api/gallery": "Get gallery samples",
            "POST /api/gallery": "Add gallery item (admin)",
            "POST /api/analytics": "Record analytics event",
            "GET /api/analytics": "Get analytics data",
            "GET /api/health": "Health check",
        },
        "documentation": "https://music.abada.kr/docs/api",
    }))
}

async fn not_found() -> AppError {
    AppError::NotFound
}
