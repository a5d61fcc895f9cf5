use crate::app::AppState;
use crate::auth::require_admin;
use crate::error::{AppError, AppResult, LoggedJson};
use crate::gallery::types::*;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use std::sync::Arc;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// `item-{unix millis}-{9 random base36 chars}`.
fn new_item_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("item-{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("Missing required field: {field}")))
}

impl NewGalleryItem {
    /// Validate and fill defaults for everything optional.
    pub fn into_item(self, id: String, created_at: String) -> AppResult<GalleryItem> {
        Ok(GalleryItem {
            id,
            title: required(self.title, "title")?,
            audio_url: required(self.audio_url, "audio_url")?,
            description: self.description.unwrap_or_default(),
            lyrics: self.lyrics.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            thumbnail_url: self.thumbnail_url.unwrap_or_default(),
            duration_seconds: self.duration_seconds.unwrap_or(0),
            created_at,
            created_by: self
                .created_by
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            featured: self.featured.unwrap_or(false),
            plays: 0,
        })
    }
}

/// GET /api/gallery
pub async fn list_gallery(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GalleryQueryParams>,
) -> AppResult<Json<GalleryPage>> {
    let storage = state.require_storage()?;
    let query = GalleryQuery::from(params);
    let (limit, offset) = (query.limit, query.offset);

    let listing = storage
        .gallery
        .query(query)
        .await
        .map_err(AppError::internal("Failed to retrieve gallery"))?;

    Ok(Json(GalleryPage {
        success: true,
        items: listing.items,
        pagination: Pagination {
            total: listing.total,
            limit,
            offset,
            has_more: u64::from(offset) + u64::from(limit) < listing.total,
        },
        available_tags: listing.available_tags,
        generated_at: Utc::now(),
    }))
}

/// POST /api/gallery - admin only.
pub async fn add_gallery_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<LoggedJson<NewGalleryItem>, AppError>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    require_admin(&headers, &state.admin_api_key)?;
    let storage = state.require_storage()?;
    let LoggedJson(input) = body?;

    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let item = input.into_item(new_item_id(), created_at)?;

    storage
        .gallery
        .insert(item.clone())
        .await
        .map_err(AppError::internal("Failed to add gallery item"))?;
    tracing::info!(id = %item.id, title = %item.title, "gallery item added");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "item": item,
            "message": "Gallery item added successfully",
        })),
    ))
}
