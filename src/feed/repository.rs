//! Feed item repository for Feedloom.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::types::{FeedItem, FeedItemKind, NewFeedItem};
use crate::datetime::{format_timestamp, parse_datetime};
use crate::db::DbPool;
use crate::{IngestError, Result};

/// Bind parameters per `IN (...)` lookup; well under SQLite's variable limit.
const LOOKUP_CHUNK_SIZE: usize = 500;

const ITEM_COLUMNS: &str = r#"
    id, source_id, kind, external_id, title, summary, link_url, image_url, author,
    youtube_video_id, embed_url, published_at, imported_at, is_active
"#;

/// Row type for a feed item from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedItemRow {
    id: String,
    source_id: i64,
    kind: String,
    external_id: String,
    title: String,
    summary: Option<String>,
    link_url: String,
    image_url: Option<String>,
    author: Option<String>,
    youtube_video_id: Option<String>,
    embed_url: Option<String>,
    published_at: String,
    imported_at: String,
    is_active: bool,
}

impl TryFrom<FeedItemRow> for FeedItem {
    type Error = IngestError;

    fn try_from(row: FeedItemRow) -> Result<Self> {
        Ok(FeedItem {
            id: row.id,
            source_id: row.source_id,
            kind: row.kind.parse::<FeedItemKind>()?,
            external_id: row.external_id,
            title: row.title,
            summary: row.summary,
            link_url: row.link_url,
            image_url: row.image_url,
            author: row.author,
            youtube_video_id: row.youtube_video_id,
            embed_url: row.embed_url,
            published_at: parse_datetime(&row.published_at).unwrap_or_else(Utc::now),
            imported_at: parse_datetime(&row.imported_at).unwrap_or_else(Utc::now),
            is_active: row.is_active,
        })
    }
}

/// Repository for feed item operations.
pub struct FeedItemRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedItemRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Return the subset of `external_ids` already stored for `source_id`.
    pub async fn existing_external_ids(
        &self,
        source_id: i64,
        external_ids: &[String],
    ) -> Result<HashSet<String>> {
        let mut existing = HashSet::new();

        for chunk in external_ids.chunks(LOOKUP_CHUNK_SIZE) {
            let mut query: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("SELECT external_id FROM feed_items WHERE source_id = ");
            query.push_bind(source_id);
            query.push(" AND external_id IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            let found: Vec<String> = query
                .build_query_scalar::<String>()
                .fetch_all(self.pool)
                .await
                .map_err(|e| IngestError::Database(e.to_string()))?;
            existing.extend(found);
        }

        Ok(existing)
    }

    /// Insert an item, ignoring it if `(source_id, external_id)` already exists.
    ///
    /// Returns the generated ID when a row was written.
    pub async fn insert_or_ignore(
        &self,
        item: &NewFeedItem,
        imported_at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        insert_or_ignore_with(self.pool, item, imported_at).await
    }

    /// Get an item by its origin identifier.
    pub async fn get_by_external_id(
        &self,
        source_id: i64,
        external_id: &str,
    ) -> Result<Option<FeedItem>> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM feed_items WHERE source_id = $1 AND external_id = $2"
        );
        let row = sqlx::query_as::<_, FeedItemRow>(&query)
            .bind(source_id)
            .bind(external_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        row.map(FeedItem::try_from).transpose()
    }

    /// List a source's items, newest first.
    pub async fn list_by_source(&self, source_id: i64, limit: usize) -> Result<Vec<FeedItem>> {
        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM feed_items
            WHERE source_id = $1
            ORDER BY published_at DESC, imported_at DESC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, FeedItemRow>(&query)
            .bind(source_id)
            .bind(limit as i64)
            .fetch_all(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        rows.into_iter().map(FeedItem::try_from).collect()
    }

    /// List active items across all sources, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<FeedItem>> {
        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM feed_items
            WHERE is_active = 1
            ORDER BY published_at DESC, imported_at DESC
            LIMIT $1
            "#
        );
        let rows = sqlx::query_as::<_, FeedItemRow>(&query)
            .bind(limit as i64)
            .fetch_all(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        rows.into_iter().map(FeedItem::try_from).collect()
    }

    /// Count a source's items.
    pub async fn count_by_source(&self, source_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feed_items WHERE source_id = $1")
            .bind(source_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(count.0)
    }
}

/// Insert an item on any executor, so several inserts can share one
/// transaction. Returns the generated ID when a row was written.
pub(crate) async fn insert_or_ignore_with<'e, E>(
    executor: E,
    item: &NewFeedItem,
    imported_at: DateTime<Utc>,
) -> Result<Option<String>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let id = Uuid::new_v4().to_string();

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO feed_items (
            id, source_id, kind, external_id, title, summary, link_url, image_url,
            author, youtube_video_id, embed_url, published_at, imported_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(&id)
    .bind(item.source_id)
    .bind(item.kind.as_str())
    .bind(&item.external_id)
    .bind(&item.title)
    .bind(&item.summary)
    .bind(&item.link_url)
    .bind(&item.image_url)
    .bind(&item.author)
    .bind(&item.youtube_video_id)
    .bind(&item.embed_url)
    .bind(format_timestamp(&item.published_at))
    .bind(format_timestamp(&imported_at))
    .execute(executor)
    .await
    .map_err(|e| IngestError::Database(e.to_string()))?;

    if result.rows_affected() > 0 {
        Ok(Some(id))
    } else {
        Ok(None)
    }
}
