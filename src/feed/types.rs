//! Feed item types for Feedloom.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::text::{
    clean_field, truncate_chars, MAX_AUTHOR_LENGTH, MAX_EXTERNAL_ID_LENGTH, MAX_IMAGE_URL_LENGTH,
    MAX_LINK_LENGTH, MAX_SUMMARY_LENGTH, MAX_TITLE_LENGTH,
};
use crate::IngestError;

/// Base URL of the YouTube embed player.
pub const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Embed URL for a YouTube video id.
pub fn youtube_embed_url(video_id: &str) -> String {
    format!("{YOUTUBE_EMBED_BASE}{video_id}")
}

/// Kind of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedItemKind {
    /// Text article (RSS entries, internal posts).
    Article,
    /// Video (YouTube uploads).
    Video,
}

impl FeedItemKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedItemKind::Article => "article",
            FeedItemKind::Video => "video",
        }
    }
}

impl fmt::Display for FeedItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedItemKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(FeedItemKind::Article),
            "video" => Ok(FeedItemKind::Video),
            other => Err(IngestError::Validation(format!(
                "unknown feed item kind: {other}"
            ))),
        }
    }
}

/// A stored feed item.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// Generated item ID (UUID).
    pub id: String,
    /// Owning source.
    pub source_id: i64,
    /// Item kind.
    pub kind: FeedItemKind,
    /// Identifier reported by the origin; unique per source.
    pub external_id: String,
    /// Title.
    pub title: String,
    /// Plain-text summary.
    pub summary: Option<String>,
    /// Link to the original content.
    pub link_url: String,
    /// Preview image.
    pub image_url: Option<String>,
    /// Author or channel name.
    pub author: Option<String>,
    /// YouTube video id (videos only).
    pub youtube_video_id: Option<String>,
    /// YouTube embed URL (videos only).
    pub embed_url: Option<String>,
    /// When the origin published the item.
    pub published_at: DateTime<Utc>,
    /// When the item was ingested.
    pub imported_at: DateTime<Utc>,
    /// Managed outside the ingest core.
    pub is_active: bool,
}

/// A candidate item produced by a parser.
///
/// Every constructor and setter trims and truncates its input, so a
/// candidate is always within the storage limits.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedItem {
    /// Owning source.
    pub source_id: i64,
    /// Item kind.
    pub kind: FeedItemKind,
    /// Dedupe key within the source.
    pub external_id: String,
    /// Title.
    pub title: String,
    /// Plain-text summary.
    pub summary: Option<String>,
    /// Link to the original content.
    pub link_url: String,
    /// Preview image.
    pub image_url: Option<String>,
    /// Author or channel name.
    pub author: Option<String>,
    /// YouTube video id (videos only).
    pub youtube_video_id: Option<String>,
    /// YouTube embed URL (videos only).
    pub embed_url: Option<String>,
    /// When the origin published the item.
    pub published_at: DateTime<Utc>,
}

impl NewFeedItem {
    /// Create an article candidate.
    pub fn article(
        source_id: i64,
        external_id: &str,
        title: &str,
        link_url: &str,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id,
            kind: FeedItemKind::Article,
            external_id: truncate_chars(external_id.trim(), MAX_EXTERNAL_ID_LENGTH),
            title: truncate_chars(title.trim(), MAX_TITLE_LENGTH),
            summary: None,
            link_url: truncate_chars(link_url.trim(), MAX_LINK_LENGTH),
            image_url: None,
            author: None,
            youtube_video_id: None,
            embed_url: None,
            published_at,
        }
    }

    /// Create a video candidate keyed by its YouTube video id.
    pub fn video(
        source_id: i64,
        video_id: &str,
        title: &str,
        link_url: &str,
        published_at: DateTime<Utc>,
    ) -> Self {
        let video_id = truncate_chars(video_id.trim(), MAX_EXTERNAL_ID_LENGTH);
        Self {
            source_id,
            kind: FeedItemKind::Video,
            embed_url: Some(youtube_embed_url(&video_id)),
            youtube_video_id: Some(video_id.clone()),
            external_id: video_id,
            title: truncate_chars(title.trim(), MAX_TITLE_LENGTH),
            summary: None,
            link_url: truncate_chars(link_url.trim(), MAX_LINK_LENGTH),
            image_url: None,
            author: None,
            published_at,
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: Option<&str>) -> Self {
        self.summary = clean_field(summary, MAX_SUMMARY_LENGTH);
        self
    }

    /// Set the image URL.
    pub fn with_image_url(mut self, image_url: Option<&str>) -> Self {
        self.image_url = clean_field(image_url, MAX_IMAGE_URL_LENGTH);
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: Option<&str>) -> Self {
        self.author = clean_field(author, MAX_AUTHOR_LENGTH);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_embed_derivation() {
        let item = NewFeedItem::video(
            1,
            "abc123XYZ9",
            "A video",
            "https://www.youtube.com/watch?v=abc123XYZ9",
            Utc::now(),
        );
        assert_eq!(
            item.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/abc123XYZ9")
        );
        assert_eq!(item.external_id, "abc123XYZ9");
        assert_eq!(item.youtube_video_id.as_deref(), Some("abc123XYZ9"));
        assert_eq!(item.kind, FeedItemKind::Video);
    }

    #[test]
    fn test_article_truncates_fields() {
        let title = "t".repeat(600);
        let link = format!("https://example.com/{}", "x".repeat(2000));
        let item = NewFeedItem::article(1, &"g".repeat(400), &title, &link, Utc::now())
            .with_summary(Some(&"s".repeat(3000)))
            .with_author(Some(&"a".repeat(300)));

        assert_eq!(item.title.chars().count(), MAX_TITLE_LENGTH);
        assert_eq!(item.external_id.chars().count(), MAX_EXTERNAL_ID_LENGTH);
        assert_eq!(item.link_url.chars().count(), MAX_LINK_LENGTH);
        assert_eq!(item.summary.unwrap().chars().count(), MAX_SUMMARY_LENGTH);
        assert_eq!(item.author.unwrap().chars().count(), MAX_AUTHOR_LENGTH);
    }

    #[test]
    fn test_article_trims() {
        let item = NewFeedItem::article(1, "  guid-1 ", "  Title ", " https://e.x/a ", Utc::now())
            .with_image_url(Some("   "));
        assert_eq!(item.external_id, "guid-1");
        assert_eq!(item.title, "Title");
        assert_eq!(item.link_url, "https://e.x/a");
        assert!(item.image_url.is_none());
        assert!(item.embed_url.is_none());
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!("article".parse::<FeedItemKind>().unwrap(), FeedItemKind::Article);
        assert_eq!("video".parse::<FeedItemKind>().unwrap(), FeedItemKind::Video);
        assert!("podcast".parse::<FeedItemKind>().is_err());
    }
}
