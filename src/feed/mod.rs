//! Feed items for Feedloom.
//!
//! A feed item is one canonical article or video produced by ingestion.
//! Items are append-only here; `(source_id, external_id)` is unique.

mod repository;
pub mod text;
mod types;

pub(crate) use repository::insert_or_ignore_with;
pub use repository::FeedItemRepository;
pub use types::{youtube_embed_url, FeedItem, FeedItemKind, NewFeedItem, YOUTUBE_EMBED_BASE};
