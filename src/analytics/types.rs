use crate::error::lenient;
use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Body of `POST /api/analytics`. Every field is optional; a missing
/// `event` means `page_view`. A mistyped `page` or `referrer` is ignored on
/// its own without discarding the rest of the body.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsEventBody {
    /// Kept raw so a non-string event is rejected rather than defaulted.
    #[serde(default)]
    pub event: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub referrer: Option<String>,
    /// Accepted for client compatibility; not counted.
    #[allow(dead_code)]
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl AnalyticsEventBody {
    /// `Ok(None)` when no event was named (absent, null or empty string),
    /// `Err` with the raw value when it is not a string.
    pub fn event_name(&self) -> Result<Option<&str>, &Value> {
        match &self.event {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(other),
        }
    }
}

/// Query string of `GET /api/analytics`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQueryParams {
    pub period: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Default, Serialize)]
pub struct AnalyticsTotals {
    pub events: u64,
    pub page_views: u64,
}

/// Aggregated analytics document.
#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub period: &'static str,
    pub date_range: DateRange,
    pub events: RankedCounts,
    pub pages: RankedCounts,
    pub referrers: BTreeMap<String, u64>,
    pub countries: BTreeMap<String, u64>,
    /// Hour of day (UTC) → count, for the most recent date only.
    pub hourly: BTreeMap<u32, u64>,
    pub totals: AnalyticsTotals,
    pub generated_at: DateTime<Utc>,
}

/// Counts serialized as a JSON object whose keys are ordered by descending
/// count, ties broken by name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RankedCounts(Vec<(String, u64)>);

impl RankedCounts {
    pub fn entries(&self) -> &[(String, u64)] {
        &self.0
    }
}

impl From<HashMap<String, u64>> for RankedCounts {
    fn from(totals: HashMap<String, u64>) -> Self {
        let mut entries: Vec<(String, u64)> = totals.into_iter().collect();
        entries.sort_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)));
        RankedCounts(entries)
    }
}

impl Serialize for RankedCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}
