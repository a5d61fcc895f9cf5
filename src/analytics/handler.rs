use crate::analytics::dimensions::{clean_page_path, country_code, referrer_source};
use crate::analytics::types::*;
use crate::app::AppState;
use crate::cache::cached_or_compute;
use crate::counter::{AnalyticsHit, CounterKey, Counters, DIM_COUNTRY, DIM_PAGE, DIM_REFERRER};
use crate::error::{AppError, AppResult, LenientJson};
use crate::storage::StoreError;
use crate::types::{EventType, Period};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Json;
use chrono::{NaiveDate, Timelike, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Header carrying the client country, set by the edge proxy.
pub const COUNTRY_HEADER: &str = "cf-ipcountry";

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn invalid_event_type() -> AppError {
    AppError::validation_with("Invalid event type", "valid_types", EventType::valid_names())
}

/// POST /api/analytics - record one client event.
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    LenientJson(body): LenientJson<AnalyticsEventBody>,
) -> AppResult<Json<serde_json::Value>> {
    let event = match body.event_name() {
        Ok(None) => EventType::PageView,
        Ok(Some(name)) => EventType::parse(name).ok_or_else(invalid_event_type)?,
        Err(raw) => {
            tracing::debug!(event = %raw, "rejecting non-string event type");
            return Err(invalid_event_type());
        }
    };

    // The browser's Referer wins over what the page reports about itself.
    let referrer = header_str(&headers, header::REFERER).or(body.referrer.as_deref());

    let now = Utc::now();
    let hit = AnalyticsHit {
        day: now.date_naive(),
        hour: now.hour(),
        event,
        page: body
            .page
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(clean_page_path),
        referrer_source: referrer_source(referrer).to_string(),
        country: country_code(header_str(&headers, COUNTRY_HEADER)),
    };

    if let Some(storage) = &state.storage {
        storage
            .counters
            .increment_all(&hit.counter_keys())
            .await
            .map_err(AppError::internal("Failed to record analytics"))?;

        tracing::info!(
            event = %hit.event,
            page = hit.page.as_deref().unwrap_or("-"),
            referrer = %hit.referrer_source,
            country = hit.country.as_deref().unwrap_or("unknown"),
            user_agent = header_str(&headers, header::USER_AGENT).unwrap_or("unknown"),
            "analytics recorded"
        );
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Analytics event recorded",
    })))
}

/// GET /api/analytics - counters summed over `period`, optionally for one event type.
pub async fn query_analytics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQueryParams>,
) -> AppResult<Response> {
    let storage = state.require_storage()?;

    // Only day-bucketed periods apply here; anything else reads today.
    let period = match params.period.as_deref().and_then(Period::parse) {
        Some(p @ (Period::Today | Period::Week | Period::Month)) => p,
        _ => Period::Today,
    };
    let filter = match params.event_type.as_deref() {
        None | Some("all") => None,
        Some(name) => Some(EventType::parse(name).ok_or_else(invalid_event_type)?),
    };

    let key = format!(
        "analytics:{}:{}",
        period.as_str(),
        filter.map_or("all", |e| e.as_str())
    );
    let counters = storage.counters.clone();
    cached_or_compute(state.cache.as_ref(), key, || async move {
        build_report(&counters, period, filter, Utc::now().date_naive())
            .await
            .map_err(AppError::internal("Failed to retrieve analytics"))
    })
    .await
}

/// Sum every analytics counter in the period ending at `today`.
pub async fn build_report(
    counters: &Counters,
    period: Period,
    filter: Option<EventType>,
    today: NaiveDate,
) -> Result<AnalyticsReport, StoreError> {
    let dates = period.dates_ending(today);
    let event_types: Vec<EventType> = match filter {
        Some(event) => vec![event],
        None => EventType::ALL.to_vec(),
    };

    let mut events: HashMap<String, u64> = HashMap::new();
    let mut pages: HashMap<String, u64> = HashMap::new();
    let mut referrers: BTreeMap<String, u64> = BTreeMap::new();
    let mut countries: BTreeMap<String, u64> = BTreeMap::new();
    let mut totals = AnalyticsTotals::default();

    for &day in &dates {
        let keys: Vec<CounterKey> = event_types
            .iter()
            .map(|&event| CounterKey::Event { day, event })
            .collect();
        for (event, count) in event_types.iter().zip(counters.read_many(&keys).await?) {
            if count > 0 {
                *events.entry(event.as_str().to_string()).or_default() += count;
                totals.events += count;
            }
        }

        for (slug, count) in read_dimension(counters, DIM_PAGE, day, |day, slug| {
            CounterKey::PageView { day, slug }
        })
        .await?
        {
            *pages.entry(slug).or_default() += count;
            totals.page_views += count;
        }

        for (source, count) in read_dimension(counters, DIM_REFERRER, day, |day, source| {
            CounterKey::Referrer { day, source }
        })
        .await?
        {
            *referrers.entry(source).or_default() += count;
        }

        for (country, count) in read_dimension(counters, DIM_COUNTRY, day, |day, country| {
            CounterKey::Country { day, country }
        })
        .await?
        {
            *countries.entry(country).or_default() += count;
        }
    }

    let hourly_keys: Vec<CounterKey> = (0..24).map(|hour| CounterKey::Hourly { day: today, hour }).collect();
    let hourly: BTreeMap<u32, u64> = (0..24).zip(counters.read_many(&hourly_keys).await?).collect();

    Ok(AnalyticsReport {
        period: period.as_str(),
        date_range: DateRange {
            start: dates.last().copied().unwrap_or(today),
            end: today,
        },
        events: RankedCounts::from(events),
        pages: RankedCounts::from(pages),
        referrers,
        countries,
        hourly,
        totals,
        generated_at: Utc::now(),
    })
}

/// Non-zero counts for every indexed value of `category` on `day`.
async fn read_dimension(
    counters: &Counters,
    category: &'static str,
    day: NaiveDate,
    key_for: fn(NaiveDate, String) -> CounterKey,
) -> Result<Vec<(String, u64)>, StoreError> {
    let values = counters.dimension_values(category, day).await?;
    let keys: Vec<CounterKey> = values.iter().map(|v| key_for(day, v.clone())).collect();
    let counts = counters.read_many(&keys).await?;
    Ok(values
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .collect())
}
