//! Feedloom - news and video ingestion engine
//!
//! Polls RSS/Atom feeds, YouTube channel feeds and the internal posts store,
//! normalizes their entries into one feed item shape and keeps a
//! deduplicated catalog in SQLite.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod logging;
pub mod post;
pub mod source;

pub use config::Config;
pub use db::Database;
pub use error::{IngestError, Result};
pub use feed::{FeedItem, FeedItemKind, FeedItemRepository, NewFeedItem};
pub use ingest::{IngestService, Orchestrator, OrchestratorSettings, TickReport};
pub use post::{NewPost, Post, PostRepository};
pub use source::{NewSource, ScheduleUpdate, Source, SourceKind, SourceRepository};
