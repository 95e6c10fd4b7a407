//! Internal post repository.

use chrono::Utc;

use super::types::{NewPost, Post};
use crate::datetime::{format_timestamp, parse_datetime};
use crate::db::DbPool;
use crate::{IngestError, Result};

/// Row type for a post from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    image_url: Option<String>,
    author_name: Option<String>,
    is_verified: bool,
    created_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            author_name: row.author_name,
            is_verified: row.is_verified,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for internal posts.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post.
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let created_at = post.created_at.unwrap_or_else(Utc::now);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, content, image_url, author_name, is_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.author_name)
        .bind(post.is_verified)
        .bind(format_timestamp(&created_at))
        .fetch_one(self.pool)
        .await
        .map_err(|e| IngestError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| IngestError::NotFound("post".into()))
    }

    /// Get a post by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, content, image_url, author_name, is_verified, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(row.map(Post::from))
    }

    /// Mark a post as verified.
    pub async fn mark_verified(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET is_verified = 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// List verified posts, newest first.
    pub async fn list_verified(&self, limit: usize) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, content, image_url, author_name, is_verified, created_at
            FROM posts
            WHERE is_verified = 1
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .map_err(|e| IngestError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}
