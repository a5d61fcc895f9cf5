use crate::gallery::types::{GalleryItem, GalleryQuery, GallerySort};
use crate::storage::{sqlite, StoreError};
use deadpool_sqlite::Pool;
use rusqlite::{params, Connection, Row, Transaction};

/// KV key mirroring the number of gallery items.
pub const COUNT_KEY: &str = "gallery:count";

const COLUMNS: &str = "id, title, description, lyrics, tags, audio_url, thumbnail_url,
     duration_seconds, created_at, created_by, featured, plays";

/// `?1` = folded tag or NULL, `?2` = featured flag or NULL.
const FILTER: &str = "
    WHERE (?1 IS NULL OR EXISTS (
            SELECT 1 FROM json_each(gallery_items.tags_folded) WHERE json_each.value = ?1))
      AND (?2 IS NULL OR featured = ?2)";

/// One page of a listing plus what the filter UI needs.
#[derive(Debug)]
pub struct GalleryListing {
    pub items: Vec<GalleryItem>,
    /// Matches before pagination.
    pub total: u64,
    /// Every tag in the collection, regardless of filters.
    pub available_tags: Vec<String>,
}

#[derive(Clone)]
pub struct GalleryStore {
    pool: Pool,
}

impl GalleryStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert `items` only if the gallery has none. Returns how many were added.
    pub async fn seed_if_empty(&self, items: &[GalleryItem]) -> Result<usize, StoreError> {
        let items = items.to_vec();
        sqlite::run(&self.pool, move |conn| {
            let tx = conn.transaction()?;
            let existing: i64 =
                tx.query_row("SELECT COUNT(*) FROM gallery_items", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(0);
            }
            for item in &items {
                insert_row(&tx, item)?;
            }
            update_count(&tx)?;
            tx.commit()?;
            Ok(items.len())
        })
        .await
    }

    /// Store a new item and refresh the count key in one transaction.
    pub async fn insert(&self, item: GalleryItem) -> Result<(), StoreError> {
        sqlite::run(&self.pool, move |conn| {
            let tx = conn.transaction()?;
            insert_row(&tx, &item)?;
            update_count(&tx)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn query(&self, query: GalleryQuery) -> Result<GalleryListing, StoreError> {
        sqlite::run(&self.pool, move |conn| {
            let tag = query.tag.as_deref().map(fold_tag);
            let order = match query.sort {
                GallerySort::Newest => "created_at DESC, seq DESC",
                GallerySort::Oldest => "created_at ASC, seq ASC",
                GallerySort::Popular => "plays DESC, seq DESC",
            };

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM gallery_items {FILTER}"),
                params![tag, query.featured],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM gallery_items {FILTER} ORDER BY {order} LIMIT ?3 OFFSET ?4"
            ))?;
            let rows = stmt
                .query_map(
                    params![tag, query.featured, query.limit, query.offset],
                    read_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            let items = rows
                .into_iter()
                .map(into_item)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(GalleryListing {
                items,
                total: total.max(0) as u64,
                available_tags: all_tags(conn)?,
            })
        })
        .await
    }

}

/// Case folding for both stored tags and the tag filter. SQLite's `lower()`
/// is ASCII-only and is not used.
fn fold_tag(tag: &str) -> String {
    tag.to_lowercase()
}

fn insert_row(tx: &Transaction<'_>, item: &GalleryItem) -> Result<(), StoreError> {
    let tags = serde_json::to_string(&item.tags)?;
    let folded: Vec<String> = item.tags.iter().map(|t| fold_tag(t)).collect();
    let tags_folded = serde_json::to_string(&folded)?;
    tx.execute(
        &format!(
            "INSERT INTO gallery_items ({COLUMNS}, tags_folded, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM gallery_items))"
        ),
        params![
            item.id,
            item.title,
            item.description,
            item.lyrics,
            tags,
            item.audio_url,
            item.thumbnail_url,
            item.duration_seconds as i64,
            item.created_at,
            item.created_by,
            item.featured,
            item.plays as i64,
            tags_folded,
        ],
    )?;
    Ok(())
}

fn update_count(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO kv (key, value, expires_at)
         VALUES (?1, (SELECT CAST(COUNT(*) AS TEXT) FROM gallery_items), NULL)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = NULL",
        params![COUNT_KEY],
    )?;
    Ok(())
}

fn all_tags(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT json_each.value FROM gallery_items, json_each(gallery_items.tags)
         ORDER BY json_each.value",
    )?;
    let tags = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tags)
}

/// Row with `tags` still JSON-encoded.
fn read_row(row: &Row<'_>) -> rusqlite::Result<(GalleryItem, String)> {
    let item = GalleryItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        lyrics: row.get(3)?,
        tags: Vec::new(),
        audio_url: row.get(5)?,
        thumbnail_url: row.get(6)?,
        duration_seconds: row.get::<_, i64>(7)?.max(0) as u64,
        created_at: row.get(8)?,
        created_by: row.get(9)?,
        featured: row.get(10)?,
        plays: row.get::<_, i64>(11)?.max(0) as u64,
    };
    Ok((item, row.get(4)?))
}

fn into_item((mut item, tags): (GalleryItem, String)) -> Result<GalleryItem, StoreError> {
    item.tags = serde_json::from_str(&tags)?;
    Ok(item)
}
