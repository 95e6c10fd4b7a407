//! Database schema and migrations for Feedloom.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Sources table
    r#"
CREATE TABLE sources (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    name                    TEXT NOT NULL,
    kind                    TEXT NOT NULL,          -- 'rss', 'youtube', 'internal'
    feed_url                TEXT,                   -- rss only
    channel_id              TEXT,                   -- youtube only
    fetch_interval_seconds  INTEGER NOT NULL DEFAULT 0,
    fetch_interval_minutes  INTEGER NOT NULL DEFAULT 0,  -- legacy
    last_fetched_at         TEXT,
    next_fetch_at           TEXT,                   -- NULL means due now
    error_count             INTEGER NOT NULL DEFAULT 0,
    last_error              TEXT,
    is_active               INTEGER NOT NULL DEFAULT 1,
    created_at              TEXT NOT NULL
);

CREATE INDEX idx_sources_due ON sources(kind, is_active, next_fetch_at);
"#,
    // v2: Conditional GET validators and pagination cursor
    r#"
ALTER TABLE sources ADD COLUMN last_etag TEXT;
ALTER TABLE sources ADD COLUMN last_modified TEXT;
ALTER TABLE sources ADD COLUMN cursor TEXT;
"#,
    // v3: Feed items table
    r#"
CREATE TABLE feed_items (
    id                  TEXT PRIMARY KEY,       -- uuid v4
    source_id           INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    kind                TEXT NOT NULL,          -- 'article', 'video'
    external_id         TEXT NOT NULL,
    title               TEXT NOT NULL,
    summary             TEXT,
    link_url            TEXT NOT NULL,
    image_url           TEXT,
    author              TEXT,
    youtube_video_id    TEXT,
    embed_url           TEXT,
    published_at        TEXT NOT NULL,
    imported_at         TEXT NOT NULL,
    is_active           INTEGER NOT NULL DEFAULT 1,
    UNIQUE(source_id, external_id)
);

CREATE INDEX idx_feed_items_published ON feed_items(published_at DESC);
CREATE INDEX idx_feed_items_source ON feed_items(source_id, published_at DESC);
"#,
    // v4: Internal posts
    r#"
CREATE TABLE posts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL DEFAULT '',
    content         TEXT NOT NULL,
    image_url       TEXT,
    author_name     TEXT,
    is_verified     INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_posts_verified ON posts(is_verified, created_at DESC);
"#,
];
