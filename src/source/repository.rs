//! Source repository for Feedloom.

use chrono::{DateTime, Utc};

use super::types::{NewSource, ScheduleUpdate, Source, SourceKind};
use crate::datetime::{format_timestamp, now_timestamp, parse_datetime};
use crate::db::DbPool;
use crate::{IngestError, Result};

const SOURCE_COLUMNS: &str = r#"
    id, name, kind, feed_url, channel_id, fetch_interval_seconds, fetch_interval_minutes,
    last_fetched_at, next_fetch_at, error_count, last_error, last_etag, last_modified,
    cursor, is_active, created_at
"#;

/// Row type for a source from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    kind: String,
    feed_url: Option<String>,
    channel_id: Option<String>,
    fetch_interval_seconds: i64,
    fetch_interval_minutes: i64,
    last_fetched_at: Option<String>,
    next_fetch_at: Option<String>,
    error_count: i64,
    last_error: Option<String>,
    last_etag: Option<String>,
    last_modified: Option<String>,
    cursor: Option<String>,
    is_active: bool,
    created_at: String,
}

impl TryFrom<SourceRow> for Source {
    type Error = IngestError;

    fn try_from(row: SourceRow) -> Result<Self> {
        Ok(Source {
            id: row.id,
            name: row.name,
            kind: row.kind.parse::<SourceKind>()?,
            feed_url: row.feed_url,
            channel_id: row.channel_id,
            fetch_interval_seconds: row.fetch_interval_seconds,
            fetch_interval_minutes: row.fetch_interval_minutes,
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_datetime(&s)),
            next_fetch_at: row.next_fetch_at.as_deref().and_then(parse_datetime),
            schedule_token: row.next_fetch_at,
            error_count: row.error_count,
            last_error: row.last_error,
            last_etag: row.last_etag,
            last_modified: row.last_modified,
            cursor: row.cursor,
            is_active: row.is_active,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Repository for source operations.
pub struct SourceRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SourceRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a new source.
    pub async fn create(&self, source: &NewSource) -> Result<Source> {
        source.validate()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sources (name, kind, feed_url, channel_id, fetch_interval_seconds,
                                 fetch_interval_minutes, next_fetch_at, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(source.name.trim())
        .bind(source.kind.as_str())
        .bind(source.feed_url.as_deref().map(str::trim))
        .bind(source.channel_id.as_deref().map(str::trim))
        .bind(source.fetch_interval_seconds)
        .bind(source.fetch_interval_minutes)
        .bind(source.next_fetch_at.as_ref().map(format_timestamp))
        .bind(source.is_active)
        .bind(now_timestamp())
        .fetch_one(self.pool)
        .await
        .map_err(|e| IngestError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| IngestError::NotFound("source".into()))
    }

    /// Get a source by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Source>> {
        let query = format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE id = $1");
        let row = sqlx::query_as::<_, SourceRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        row.map(Source::try_from).transpose()
    }

    /// List active sources of `kind` that are due at `now`.
    ///
    /// Never-fetched sources come first, then ascending due time; ties keep
    /// registration order.
    pub async fn list_due(
        &self,
        kind: SourceKind,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Source>> {
        let query = format!(
            r#"
            SELECT {SOURCE_COLUMNS}
            FROM sources
            WHERE is_active = 1
              AND kind = $1
              AND (next_fetch_at IS NULL OR next_fetch_at <= $2)
            ORDER BY next_fetch_at IS NOT NULL, next_fetch_at ASC, id ASC
            LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, SourceRow>(&query)
            .bind(kind.as_str())
            .bind(format_timestamp(&now))
            .bind(limit as i64)
            .fetch_all(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        rows.into_iter().map(Source::try_from).collect()
    }

    /// List every source of `kind`, in registration order.
    pub async fn list_by_kind(&self, kind: SourceKind) -> Result<Vec<Source>> {
        let query = format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE kind = $1 ORDER BY id ASC");
        let rows = sqlx::query_as::<_, SourceRow>(&query)
            .bind(kind.as_str())
            .fetch_all(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        rows.into_iter().map(Source::try_from).collect()
    }

    /// Write the outcome of one processing cycle.
    ///
    /// The write only lands when the stored `next_fetch_at` text is still
    /// the one `source` was read with, so two workers racing on the same
    /// source cannot both record a cycle. Returns whether this call won.
    pub async fn apply_schedule(&self, source: &Source, update: &ScheduleUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sources
            SET last_fetched_at = COALESCE($1, last_fetched_at),
                next_fetch_at = $2,
                error_count = $3,
                last_error = $4,
                last_etag = COALESCE($5, last_etag),
                last_modified = COALESCE($6, last_modified)
            WHERE id = $7 AND next_fetch_at IS $8
            "#,
        )
        .bind(update.last_fetched_at.as_ref().map(format_timestamp))
        .bind(format_timestamp(&update.next_fetch_at))
        .bind(update.error_count)
        .bind(&update.last_error)
        .bind(&update.last_etag)
        .bind(&update.last_modified)
        .bind(source.id)
        .bind(source.schedule_token.as_deref())
        .execute(self.pool)
        .await
        .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Enable or disable a source.
    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE sources SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all sources.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sources")
            .fetch_one(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(count.0)
    }
}
