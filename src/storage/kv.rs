use crate::storage::sqlite;
use crate::storage::StoreError;
use deadpool_sqlite::Pool;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Upsert that treats an expired row as absent and a non-numeric value as 0,
/// then stores `old + 1` and refreshes the expiry. One statement, so
/// concurrent increments on the same key never lose an update.
const INCREMENT_SQL: &str = "
    INSERT INTO kv (key, value, expires_at) VALUES (?1, '1', ?2)
    ON CONFLICT (key) DO UPDATE SET
        value = CAST(
            (CASE
                WHEN kv.expires_at IS NOT NULL AND kv.expires_at <= ?3 THEN 0
                WHEN kv.value <> '' AND kv.value NOT GLOB '*[^0-9]*' THEN CAST(kv.value AS INTEGER)
                ELSE 0
            END) + 1 AS TEXT),
        expires_at = excluded.expires_at
    RETURNING value";

/// One membership row of the per-day dimension index (e.g. page `_download`
/// seen on `2026-10-18`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub category: &'static str,
    pub day: String,
    pub value: String,
}

/// String-keyed, string-valued store with optional per-key TTL.
///
/// Expired keys read as absent immediately; rows are physically removed by
/// [`crate::storage::retention::purge_loop`].
#[derive(Clone)]
pub struct KvStore {
    pool: Pool,
}

impl KvStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        sqlite::run(&self.pool, move |conn| Ok(get_live(conn, &key, now_secs())?)).await
    }

    /// Read and decode a JSON value. A missing key is `Ok(None)`.
    pub async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        sqlite::run(&self.pool, move |conn| {
            let expires_at = expiry(now_secs(), ttl);
            conn.execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )?;
            Ok(())
        })
        .await
    }

    /// Counter value of `key`: missing, expired or non-numeric reads as 0.
    pub async fn get_count(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.get(key).await?.map_or(0, |raw| parse_count(&raw)))
    }

    /// Read many counters in one connection checkout, preserving order.
    pub async fn get_counts(&self, keys: Vec<String>) -> Result<Vec<u64>, StoreError> {
        sqlite::run(&self.pool, move |conn| {
            let now = now_secs();
            let mut counts = Vec::with_capacity(keys.len());
            for key in &keys {
                counts.push(get_live(conn, key, now)?.map_or(0, |raw| parse_count(&raw)));
            }
            Ok(counts)
        })
        .await
    }

    /// Add one to the counter at `key` and return the new value. The TTL is
    /// measured from this write, not from key creation.
    pub async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<u64, StoreError> {
        self.increment_indexed(key, ttl, None).await
    }

    /// Like [`increment`](Self::increment), also recording `entry` in the
    /// dimension index within the same transaction.
    pub async fn increment_indexed(
        &self,
        key: &str,
        ttl: Option<Duration>,
        entry: Option<IndexEntry>,
    ) -> Result<u64, StoreError> {
        let key = key.to_string();
        sqlite::run(&self.pool, move |conn| {
            let now = now_secs();
            let expires_at = expiry(now, ttl);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let raw: String =
                tx.query_row(INCREMENT_SQL, params![key, expires_at, now], |row| row.get(0))?;
            if let Some(entry) = entry {
                tx.execute(
                    "INSERT INTO dimension_index (category, day, value, expires_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (category, day, value) DO UPDATE SET expires_at = excluded.expires_at",
                    params![entry.category, entry.day, entry.value, expires_at],
                )?;
            }
            tx.commit()?;
            Ok(parse_count(&raw))
        })
        .await
    }

    /// Distinct values recorded for `category` on `day`, sorted.
    pub async fn dimension_values(
        &self,
        category: &'static str,
        day: &str,
    ) -> Result<Vec<String>, StoreError> {
        let day = day.to_string();
        sqlite::run(&self.pool, move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT value FROM dimension_index
                 WHERE category = ?1 AND day = ?2 AND (expires_at IS NULL OR expires_at > ?3)
                 ORDER BY value",
            )?;
            let rows = stmt.query_map(params![category, day, now_secs()], |row| row.get(0))?;
            let values = rows.collect::<Result<Vec<String>, _>>()?;
            Ok(values)
        })
        .await
    }

    /// Delete expired keys and index rows. Returns (kv_deleted, index_deleted).
    pub async fn purge_expired(&self) -> Result<(usize, usize), StoreError> {
        sqlite::run(&self.pool, |conn| {
            let now = now_secs();
            let kv = conn.execute(
                "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )?;
            let index = conn.execute(
                "DELETE FROM dimension_index WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )?;
            Ok((kv, index))
        })
        .await
    }
}

fn get_live(conn: &Connection, key: &str, now: i64) -> rusqlite::Result<Option<String>> {
    conn.prepare_cached(
        "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
    )?
    .query_row(params![key, now], |row| row.get(0))
    .optional()
}

/// Decimal counter parse: only a non-empty run of ASCII digits counts,
/// matching the `GLOB` guard in the increment statement. Anything else is 0.
pub fn parse_count(raw: &str) -> u64 {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    raw.parse().unwrap_or(0)
}

fn expiry(now: i64, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now.saturating_add(ttl.as_secs() as i64))
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
