//! YouTube channel feed parser (Atom with media-RSS extensions).

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use url::Url;

use super::{entry_author, entry_image, entry_link, entry_title, newest_first, parse_document};
use crate::feed::NewFeedItem;
use crate::Result;

/// Prefix of the entry id YouTube puts on every upload.
const VIDEO_ID_PREFIX: &str = "yt:video:";

/// Base URL of the public watch page.
pub const YOUTUBE_WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

/// Extract the video id from an entry: the `yt:video:` entry id, else the
/// `v` query parameter of its link.
pub fn video_id_from_entry(entry: &Entry) -> Option<String> {
    if let Some(id) = entry.id.trim().strip_prefix(VIDEO_ID_PREFIX) {
        let id = id.trim();
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    let link = Url::parse(entry_link(entry)?).ok()?;
    link.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Parse a channel feed into video candidates keyed by video id.
///
/// Entries without a video id or title are skipped. The channel name from
/// the feed header stands in for missing entry authors.
pub fn parse_youtube(
    source_id: i64,
    body: &[u8],
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<Vec<NewFeedItem>> {
    let feed = parse_document(body)?;
    let channel_name = feed
        .authors
        .iter()
        .map(|p| p.name.trim())
        .find(|name| !name.is_empty())
        .or_else(|| feed.title.as_ref().map(|t| t.content.trim()))
        .filter(|name| !name.is_empty());

    let items = feed
        .entries
        .iter()
        .filter_map(|entry| {
            let video_id = video_id_from_entry(entry)?;
            let title = entry_title(entry)?;
            let watch_url = entry_link(entry)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{YOUTUBE_WATCH_BASE}{video_id}"));

            let description = entry
                .media
                .iter()
                .filter_map(|m| m.description.as_ref())
                .map(|d| d.content.as_str())
                .find(|d| !d.trim().is_empty())
                .or_else(|| entry.summary.as_ref().map(|s| s.content.as_str()));
            let thumbnail = entry_image(entry);

            Some(
                NewFeedItem::video(
                    source_id,
                    &video_id,
                    title,
                    &watch_url,
                    entry.published.or(entry.updated).unwrap_or(now),
                )
                .with_summary(description)
                .with_author(entry_author(entry).or(channel_name))
                .with_image_url(thumbnail.as_deref()),
            )
        })
        .collect();

    Ok(newest_first(items, max_items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedItemKind;
    use chrono::TimeZone;

    const CHANNEL_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UCexample"/>
 <id>yt:channel:UCexample</id>
 <yt:channelId>UCexample</yt:channelId>
 <title>Example Channel</title>
 <author>
  <name>Example Channel</name>
  <uri>https://www.youtube.com/channel/UCexample</uri>
 </author>
 <published>2020-01-01T00:00:00+00:00</published>
 <entry>
  <id>yt:video:abc123XYZ9</id>
  <yt:videoId>abc123XYZ9</yt:videoId>
  <yt:channelId>UCexample</yt:channelId>
  <title>First upload</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=abc123XYZ9"/>
  <author>
   <name>Example Channel</name>
   <uri>https://www.youtube.com/channel/UCexample</uri>
  </author>
  <published>2024-01-15T10:00:00+00:00</published>
  <updated>2024-01-15T12:00:00+00:00</updated>
  <media:group>
   <media:title>First upload</media:title>
   <media:content url="https://www.youtube.com/v/abc123XYZ9?version=3" type="application/x-shockwave-flash" width="640" height="390"/>
   <media:thumbnail url="https://i1.ytimg.com/vi/abc123XYZ9/hqdefault.jpg" width="480" height="360"/>
   <media:description>A description of the first upload.</media:description>
  </media:group>
 </entry>
 <entry>
  <id>yt:video:def456UVW0</id>
  <title>Second upload</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=def456UVW0"/>
  <published>2024-01-16T10:00:00+00:00</published>
 </entry>
 <entry>
  <id>yt:video:</id>
  <title>Broken entry</title>
 </entry>
 <entry>
  <id>yt:video:ghi789RST1</id>
  <title> </title>
  <published>2024-01-17T10:00:00+00:00</published>
 </entry>
</feed>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_channel_feed() {
        let items = parse_youtube(5, CHANNEL_FEED.as_bytes(), 15, now()).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == FeedItemKind::Video));
        assert_eq!(items[0].external_id, "def456UVW0");
        assert_eq!(items[1].external_id, "abc123XYZ9");
    }

    #[test]
    fn test_media_fields() {
        let items = parse_youtube(5, CHANNEL_FEED.as_bytes(), 15, now()).unwrap();
        let first = items.iter().find(|i| i.external_id == "abc123XYZ9").unwrap();

        assert_eq!(first.title, "First upload");
        assert_eq!(first.link_url, "https://www.youtube.com/watch?v=abc123XYZ9");
        assert_eq!(
            first.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/abc123XYZ9")
        );
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://i1.ytimg.com/vi/abc123XYZ9/hqdefault.jpg")
        );
        assert_eq!(
            first.summary.as_deref(),
            Some("A description of the first upload.")
        );
        assert_eq!(first.author.as_deref(), Some("Example Channel"));
        assert_eq!(
            first.published_at,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_channel_name_fallback_for_author() {
        let items = parse_youtube(5, CHANNEL_FEED.as_bytes(), 15, now()).unwrap();
        let second = items.iter().find(|i| i.external_id == "def456UVW0").unwrap();
        assert_eq!(second.author.as_deref(), Some("Example Channel"));
        assert!(second.image_url.is_none());
    }

    #[test]
    fn test_video_id_from_watch_link() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
 <title>Channel</title>
 <entry>
  <id>tag:example,2024:1</id>
  <title>Linked only</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=QQQ111&amp;t=10"/>
 </entry>
</feed>"#;
        let items = parse_youtube(1, xml.as_bytes(), 15, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "QQQ111");
        assert_eq!(items[0].published_at, now());
    }

    #[test]
    fn test_watch_url_fallback() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
 <title>Channel</title>
 <entry>
  <id>yt:video:NoLink01</id>
  <title>No link</title>
  <published>2024-01-15T10:00:00Z</published>
 </entry>
</feed>"#;
        let items = parse_youtube(1, xml.as_bytes(), 15, now()).unwrap();
        assert_eq!(items[0].link_url, "https://www.youtube.com/watch?v=NoLink01");
    }

    #[test]
    fn test_cap() {
        let items = parse_youtube(5, CHANNEL_FEED.as_bytes(), 1, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "def456UVW0");
    }
}
