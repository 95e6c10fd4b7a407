//! Dedupe/upsert of parsed candidates.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::db::DbPool;
use crate::feed::{insert_or_ignore_with, FeedItemRepository, NewFeedItem};
use crate::Result;

/// Persists only the candidates a source has not produced before.
pub struct DedupeEngine<'a> {
    pool: &'a DbPool,
}

impl<'a> DedupeEngine<'a> {
    /// Create an engine over the catalog pool.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert the new candidates of one source and return how many rows
    /// were written.
    ///
    /// Duplicate external ids within `candidates` keep their first
    /// occurrence. All inserts for the source commit together; the unique
    /// `(source_id, external_id)` constraint absorbs any concurrent writer.
    pub async fn ingest(
        &self,
        source_id: i64,
        candidates: &[NewFeedItem],
        imported_at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut seen = HashSet::new();
        let distinct: Vec<&NewFeedItem> = candidates
            .iter()
            .filter(|c| c.source_id == source_id && !c.external_id.is_empty())
            .filter(|c| seen.insert(c.external_id.as_str()))
            .collect();
        if distinct.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = distinct.iter().map(|c| c.external_id.clone()).collect();
        let existing = FeedItemRepository::new(self.pool)
            .existing_external_ids(source_id, &ids)
            .await?;

        let fresh: Vec<&NewFeedItem> = distinct
            .into_iter()
            .filter(|c| !existing.contains(&c.external_id))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for item in fresh {
            if insert_or_ignore_with(&mut *tx, item, imported_at).await?.is_some() {
                added += 1;
            }
        }
        tx.commit().await?;

        Ok(added)
    }
}
