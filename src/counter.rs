//! Counter service: turns a recorded event into a fixed set of counter keys
//! with a TTL policy per key class, and applies them to the key-value store.
//!
//! Key layout (values are decimal strings):
//!
//! ```text
//! analytics:event:{YYYY-MM-DD}:{event}       90d
//! analytics:pageview:{YYYY-MM-DD}:{slug}     90d   (indexed)
//! analytics:referrer:{YYYY-MM-DD}:{source}   90d   (indexed)
//! analytics:hourly:{YYYY-MM-DD}:{0-23}       7d
//! analytics:country:{YYYY-MM-DD}:{ISO}       90d   (indexed)
//! download:{os}:{YYYY-MM-DD}                 365d
//! download:total:{os}                        never expires
//! ```

use crate::storage::{IndexEntry, KvStore, StoreError};
use crate::types::{day_key, EventType, Platform};
use chrono::NaiveDate;
use std::time::Duration;

const DAY: u64 = 60 * 60 * 24;
pub const ANALYTICS_TTL: Duration = Duration::from_secs(90 * DAY);
pub const HOURLY_TTL: Duration = Duration::from_secs(7 * DAY);
pub const DOWNLOAD_DAILY_TTL: Duration = Duration::from_secs(365 * DAY);

/// Dimension-index categories for counters whose discriminator is open-ended.
pub const DIM_PAGE: &str = "pageview";
pub const DIM_REFERRER: &str = "referrer";
pub const DIM_COUNTRY: &str = "country";

/// Key segment for a cleaned page path: `/` becomes `_`.
pub fn page_slug(path: &str) -> String {
    path.replace('/', "_")
}

/// One (category, date, discriminator) counter bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterKey {
    Event { day: NaiveDate, event: EventType },
    /// `slug` is the cleaned page path with `/` replaced (`_download`). Distinct
    /// paths can share a slug; they share the counter and the index entry.
    PageView { day: NaiveDate, slug: String },
    Referrer { day: NaiveDate, source: String },
    Hourly { day: NaiveDate, hour: u32 },
    Country { day: NaiveDate, country: String },
    DownloadDaily { os: Platform, day: NaiveDate },
    DownloadTotal { os: Platform },
}

impl CounterKey {
    pub fn key(&self) -> String {
        match self {
            CounterKey::Event { day, event } => {
                format!("analytics:event:{}:{}", day_key(*day), event)
            }
            CounterKey::PageView { day, slug } => {
                format!("analytics:pageview:{}:{}", day_key(*day), slug)
            }
            CounterKey::Referrer { day, source } => {
                format!("analytics:referrer:{}:{}", day_key(*day), source)
            }
            CounterKey::Hourly { day, hour } => {
                format!("analytics:hourly:{}:{}", day_key(*day), hour)
            }
            CounterKey::Country { day, country } => {
                format!("analytics:country:{}:{}", day_key(*day), country)
            }
            CounterKey::DownloadDaily { os, day } => format!("download:{}:{}", os, day_key(*day)),
            CounterKey::DownloadTotal { os } => format!("download:total:{os}"),
        }
    }

    /// Expiry window, reset on every increment. `None` never expires.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CounterKey::Event { .. }
            | CounterKey::PageView { .. }
            | CounterKey::Referrer { .. }
            | CounterKey::Country { .. } => Some(ANALYTICS_TTL),
            CounterKey::Hourly { .. } => Some(HOURLY_TTL),
            CounterKey::DownloadDaily { .. } => Some(DOWNLOAD_DAILY_TTL),
            CounterKey::DownloadTotal { .. } => None,
        }
    }

    fn index_entry(&self) -> Option<IndexEntry> {
        let (category, day, value) = match self {
            CounterKey::PageView { day, slug } => (DIM_PAGE, day, slug),
            CounterKey::Referrer { day, source } => (DIM_REFERRER, day, source),
            CounterKey::Country { day, country } => (DIM_COUNTRY, day, country),
            _ => return None,
        };
        Some(IndexEntry {
            category,
            day: day_key(*day),
            value: value.clone(),
        })
    }
}

/// A validated analytics hit, already reduced to key discriminators.
#[derive(Debug, Clone)]
pub struct AnalyticsHit {
    pub day: NaiveDate,
    pub hour: u32,
    pub event: EventType,
    /// Cleaned page path; `None` when the client sent no page.
    pub page: Option<String>,
    pub referrer_source: String,
    /// ISO country code; `None` when the transport did not supply one.
    pub country: Option<String>,
}

impl AnalyticsHit {
    /// Counters touched by this hit, in write order.
    pub fn counter_keys(&self) -> Vec<CounterKey> {
        let day = self.day;
        let mut keys = vec![CounterKey::Event {
            day,
            event: self.event,
        }];
        if let Some(path) = &self.page {
            keys.push(CounterKey::PageView {
                day,
                slug: page_slug(path),
            });
        }
        keys.push(CounterKey::Referrer {
            day,
            source: self.referrer_source.clone(),
        });
        keys.push(CounterKey::Hourly {
            day,
            hour: self.hour,
        });
        if let Some(country) = &self.country {
            keys.push(CounterKey::Country {
                day,
                country: country.clone(),
            });
        }
        keys
    }
}

/// Counters touched by one download: the daily bucket and the lifetime total.
pub fn download_keys(os: Platform, day: NaiveDate) -> [CounterKey; 2] {
    [
        CounterKey::DownloadDaily { os, day },
        CounterKey::DownloadTotal { os },
    ]
}

/// Applies counter keys to the store.
#[derive(Clone)]
pub struct Counters {
    kv: KvStore,
}

impl Counters {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Add one to the counter and return its new value. Open-ended
    /// dimensions are recorded in the dimension index atomically with the
    /// increment.
    pub async fn increment(&self, key: &CounterKey) -> Result<u64, StoreError> {
        let raw = key.key();
        let value = self
            .kv
            .increment_indexed(&raw, key.ttl(), key.index_entry())
            .await?;
        tracing::debug!(key = %raw, value, "counter incremented");
        Ok(value)
    }

    /// Apply each key in order. There is no rollback: a failure part-way
    /// leaves the earlier increments in place.
    pub async fn increment_all(&self, keys: &[CounterKey]) -> Result<Vec<u64>, StoreError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.increment(key).await?);
        }
        Ok(values)
    }

    /// Current values of many counters, in the order given.
    pub async fn read_many(&self, keys: &[CounterKey]) -> Result<Vec<u64>, StoreError> {
        self.kv
            .get_counts(keys.iter().map(CounterKey::key).collect())
            .await
    }

    /// Discriminators seen for an indexed dimension on `day`.
    pub async fn dimension_values(
        &self,
        category: &'static str,
        day: NaiveDate,
    ) -> Result<Vec<String>, StoreError> {
        self.kv.dimension_values(category, &day_key(day)).await
    }
}
