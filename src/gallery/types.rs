use serde::{Deserialize, Serialize};

/// One gallery entry as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub lyrics: String,
    pub tags: Vec<String>,
    pub audio_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: u64,
    /// ISO-8601 UTC timestamp.
    pub created_at: String,
    pub created_by: String,
    pub featured: bool,
    pub plays: u64,
}

/// Body of `POST /api/gallery`. Only `title` and `audio_url` are required.
#[derive(Debug, Default, Deserialize)]
pub struct NewGalleryItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lyrics: Option<String>,
    pub tags: Option<Vec<String>>,
    pub audio_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<u64>,
    pub created_by: Option<String>,
    pub featured: Option<bool>,
}

/// Raw query string of `GET /api/gallery`; numbers are parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct GalleryQueryParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub tag: Option<String>,
    pub featured: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GallerySort {
    Newest,
    Oldest,
    Popular,
}

impl GallerySort {
    /// Unknown values sort newest first.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("oldest") => GallerySort::Oldest,
            Some("popular") => GallerySort::Popular,
            _ => GallerySort::Newest,
        }
    }
}

/// Normalised listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryQuery {
    pub limit: u32,
    pub offset: u32,
    pub tag: Option<String>,
    pub featured: Option<bool>,
    pub sort: GallerySort,
}

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

impl From<GalleryQueryParams> for GalleryQuery {
    fn from(params: GalleryQueryParams) -> Self {
        let limit = params
            .limit
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map_or(DEFAULT_LIMIT, |n| n.clamp(0, MAX_LIMIT as i64) as u32);
        let offset = params
            .offset
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map_or(0, |n| n.clamp(0, u32::MAX as i64) as u32);
        let featured = match params.featured.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };

        GalleryQuery {
            limit,
            offset,
            tag: params.tag.filter(|t| !t.is_empty()),
            featured,
            sort: GallerySort::parse(params.sort.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct GalleryPage {
    pub success: bool,
    pub items: Vec<GalleryItem>,
    pub pagination: Pagination,
    pub available_tags: Vec<String>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
