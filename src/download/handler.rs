use crate::app::AppState;
use crate::cache::cached_or_compute;
use crate::counter::{download_keys, CounterKey, Counters};
use crate::download::types::*;
use crate::error::{AppError, AppResult, LenientJson};
use crate::storage::StoreError;
use crate::types::{Platform, Period};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Installer URL on the latest GitHub release.
pub fn download_url(releases_url: &str, os: Platform) -> String {
    format!(
        "{}/latest/download/{}",
        releases_url.trim_end_matches('/'),
        os.installer_file()
    )
}

fn invalid_os(message: &str) -> AppError {
    AppError::validation_with(message, "valid_options", Platform::valid_ids())
}

fn redirect_to(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// Bump the daily and lifetime counters, returning `(daily, total)`.
async fn record(counters: &Counters, os: Platform) -> Result<(u64, u64), StoreError> {
    let values = counters
        .increment_all(&download_keys(os, Utc::now().date_naive()))
        .await?;
    let (daily, total) = (values[0], values[1]);
    tracing::info!(os = %os, daily, total, "download recorded");
    Ok((daily, total))
}

/// POST /api/download - record, then redirect or acknowledge with JSON.
pub async fn record_download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
    LenientJson(body): LenientJson<DownloadBody>,
) -> AppResult<Response> {
    let os = body
        .os
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(query.os.as_deref())
        .and_then(Platform::parse)
        .ok_or_else(|| invalid_os("Invalid or missing \"os\" parameter"))?;

    if let Some(storage) = &state.storage {
        record(&storage.counters, os)
            .await
            .map_err(AppError::internal("Failed to record download"))?;
    }

    let url = download_url(&state.downloads.releases_url, os);
    let redirect = match (&body.redirect, &query.redirect) {
        (Some(flag), _) => flag.enabled(),
        (None, Some(q)) => q != "false",
        (None, None) => true,
    };
    if redirect {
        return Ok(redirect_to(&url));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "os": os,
        "download_url": url,
        "message": "Download recorded",
    }))
    .into_response())
}

/// GET /api/download?os= - the link target on the download page. Recording
/// is best effort; the user always gets the installer.
pub async fn download_redirect(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Response> {
    let raw = query
        .os
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid_os("Missing \"os\" parameter"))?;
    let os = Platform::parse(raw).ok_or_else(|| invalid_os("Invalid \"os\" parameter"))?;

    if let Some(storage) = &state.storage {
        if let Err(e) = record(&storage.counters, os).await {
            tracing::warn!(os = %os, error = %e, "failed to record download, redirecting anyway");
        }
    }

    Ok(redirect_to(&download_url(&state.downloads.releases_url, os)))
}

/// GET /api/stats (and /api/download-stats).
pub async fn download_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQueryParams>,
) -> AppResult<Response> {
    let storage = state.require_storage()?;

    let period = match params.period.as_deref() {
        None | Some("") => Period::All,
        Some(p) => Period::parse(p).unwrap_or(Period::Today),
    };
    let requested = params.os.unwrap_or_else(|| "all".to_string());
    let platforms: Vec<Platform> = if requested == "all" {
        Platform::ALL.to_vec()
    } else {
        Platform::parse(&requested).into_iter().collect()
    };

    let key = format!("stats:{}:{}", period.as_str(), requested);
    let counters = storage.counters.clone();
    cached_or_compute(state.cache.as_ref(), key, || async move {
        build_stats(&counters, period, &platforms, Utc::now().date_naive())
            .await
            .map_err(AppError::internal("Failed to retrieve statistics"))
    })
    .await
}

/// Per-platform download counts for `period`. `All` reads the lifetime
/// counters; other periods sum the daily buckets ending at `today`.
pub async fn build_stats(
    counters: &Counters,
    period: Period,
    platforms: &[Platform],
    today: NaiveDate,
) -> Result<DownloadStats, StoreError> {
    let dates = period.dates_ending(today);
    let mut downloads = BTreeMap::new();
    let mut breakdown = Breakdown::default();

    for &os in platforms {
        let keys: Vec<CounterKey> = match period {
            Period::All => vec![CounterKey::DownloadTotal { os }],
            _ => dates
                .iter()
                .map(|&day| CounterKey::DownloadDaily { os, day })
                .collect(),
        };
        let count: u64 = counters.read_many(&keys).await?.into_iter().sum();
        downloads.insert(os.as_str(), count);

        match os.family() {
            "windows" => breakdown.windows += count,
            "macos" => breakdown.macos += count,
            _ => breakdown.linux += count,
        }
    }

    Ok(DownloadStats {
        period: period.as_str(),
        generated_at: Utc::now(),
        total: downloads.values().sum(),
        downloads,
        breakdown,
    })
}
