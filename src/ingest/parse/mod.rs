//! Format parsers.
//!
//! Each parser turns one payload into kind-tagged candidate items, newest
//! first and capped. None of them touch storage.

mod internal;
mod rss;
mod youtube;

pub use internal::parse_posts;
pub use rss::parse_rss;
pub use youtube::{parse_youtube, video_id_from_entry};

use feed_rs::model::{Entry, Feed, Link};
use feed_rs::parser;

use crate::feed::NewFeedItem;
use crate::{IngestError, Result};

/// Parse a syndication document.
///
/// Entries without an origin id keep an empty `id`, so callers can tell a
/// real guid from a generated one.
pub(crate) fn parse_document(body: &[u8]) -> Result<Feed> {
    parser::Builder::new()
        .id_generator(|_links: &[Link], _title: &Option<feed_rs::model::Text>, _uri: Option<&str>| {
            String::new()
        })
        .build()
        .parse(body)
        .map_err(|e| IngestError::Parse(e.to_string()))
}

/// Trimmed, non-empty entry title.
pub(crate) fn entry_title(entry: &Entry) -> Option<&str> {
    entry
        .title
        .as_ref()
        .map(|t| t.content.trim())
        .filter(|t| !t.is_empty())
}

/// Preferred link of an entry: the first alternate (or untyped) link, then
/// any link at all.
pub(crate) fn entry_link(entry: &Entry) -> Option<&str> {
    let usable = |link: &&Link| !link.href.trim().is_empty();
    entry
        .links
        .iter()
        .filter(usable)
        .find(|link| {
            link.rel
                .as_deref()
                .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| entry.links.iter().find(usable))
        .map(|link| link.href.trim())
}

/// Home page of the feed itself: its first alternate (or untyped) link.
pub(crate) fn feed_home_link(feed: &Feed) -> Option<&str> {
    feed.links
        .iter()
        .filter(|link| !link.href.trim().is_empty())
        .find(|link| {
            link.rel
                .as_deref()
                .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .map(|link| link.href.trim())
}

/// First author name of an entry.
pub(crate) fn entry_author(entry: &Entry) -> Option<&str> {
    entry
        .authors
        .iter()
        .map(|p| p.name.trim())
        .find(|name| !name.is_empty())
}

/// First media thumbnail, then the first image enclosure.
pub(crate) fn entry_image(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.trim())
        .find(|uri| !uri.is_empty());
    if let Some(uri) = thumbnail {
        return Some(uri.to_string());
    }

    entry
        .links
        .iter()
        .find(|link| {
            link.rel.as_deref() == Some("enclosure")
                && link
                    .media_type
                    .as_deref()
                    .is_some_and(|t| t.starts_with("image/"))
        })
        .map(|link| link.href.trim().to_string())
}

/// Order newest first and keep at most `max_items`.
pub(crate) fn newest_first(mut items: Vec<NewFeedItem>, max_items: usize) -> Vec<NewFeedItem> {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items.truncate(max_items);
    items
}
