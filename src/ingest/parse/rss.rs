//! RSS/Atom parser.

use chrono::{DateTime, Utc};

use super::{
    entry_author, entry_image, entry_link, entry_title, feed_home_link, newest_first,
    parse_document,
};
use crate::feed::text::strip_html;
use crate::feed::NewFeedItem;
use crate::Result;

/// Parse an RSS or Atom document into article candidates.
///
/// The external id is the entry guid, else its link, else
/// `"{source_id}:{title}:{published}"`. An entry without a link points at
/// the feed's home page. Entries without a title, or with nowhere to link
/// to, are skipped. Missing dates fall back to the update date, then to `now`.
pub fn parse_rss(
    source_id: i64,
    body: &[u8],
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<Vec<NewFeedItem>> {
    let feed = parse_document(body)?;
    let home = feed_home_link(&feed);

    let items = feed
        .entries
        .iter()
        .filter_map(|entry| {
            let title = entry_title(entry)?;
            let link = entry_link(entry);
            let link_url = link.or(home)?;
            let origin_date = entry.published.or(entry.updated);

            let guid = entry.id.trim();
            let external_id = if !guid.is_empty() {
                guid.to_string()
            } else if let Some(link) = link {
                link.to_string()
            } else {
                let published = origin_date.map(|d| d.to_rfc3339()).unwrap_or_default();
                format!("{source_id}:{title}:{published}")
            };

            let summary = entry
                .summary
                .as_ref()
                .map(|s| s.content.as_str())
                .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
                .map(strip_html);
            let image = entry_image(entry);

            Some(
                NewFeedItem::article(
                    source_id,
                    &external_id,
                    title,
                    link_url,
                    origin_date.unwrap_or(now),
                )
                .with_summary(summary.as_deref())
                .with_author(entry_author(entry))
                .with_image_url(image.as_deref()),
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

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example News</title>
    <link>https://example.com</link>
    <item>
      <title>  Older story  </title>
      <link>https://example.com/older</link>
      <guid>  guid-older  </guid>
      <description>&lt;p&gt;Some &lt;b&gt;bold&lt;/b&gt; text&lt;/p&gt;</description>
      <author>reporter@example.com (Reporter)</author>
      <pubDate>Mon, 15 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Newer story</title>
      <link>https://example.com/newer</link>
      <pubDate>Tue, 16 Jan 2024 10:00:00 GMT</pubDate>
      <media:thumbnail url="https://example.com/newer.jpg"/>
    </item>
    <item>
      <title>   </title>
      <link>https://example.com/untitled</link>
      <guid>guid-untitled</guid>
    </item>
  </channel>
</rss>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_rss_items() {
        let items = parse_rss(7, RSS.as_bytes(), 50, now()).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == FeedItemKind::Article));
        assert!(items.iter().all(|i| i.source_id == 7));

        // Newest first.
        assert_eq!(items[0].title, "Newer story");
        assert_eq!(items[1].title, "Older story");
    }

    #[test]
    fn test_guid_wins_over_link() {
        let items = parse_rss(7, RSS.as_bytes(), 50, now()).unwrap();
        let older = items.iter().find(|i| i.title == "Older story").unwrap();
        assert_eq!(older.external_id, "guid-older");
        assert_eq!(older.link_url, "https://example.com/older");
    }

    #[test]
    fn test_link_used_without_guid() {
        let items = parse_rss(7, RSS.as_bytes(), 50, now()).unwrap();
        let newer = items.iter().find(|i| i.title == "Newer story").unwrap();
        assert_eq!(newer.external_id, "https://example.com/newer");
        assert_eq!(newer.image_url.as_deref(), Some("https://example.com/newer.jpg"));
    }

    #[test]
    fn test_summary_is_plain_text() {
        let items = parse_rss(7, RSS.as_bytes(), 50, now()).unwrap();
        let older = items.iter().find(|i| i.title == "Older story").unwrap();
        assert_eq!(older.summary.as_deref(), Some("Some bold text"));
        assert_eq!(
            older.published_at,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_synthesized_id_without_guid_or_link() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title><link>https://example.com/</link>
<item><title>Lonely</title><pubDate>Mon, 15 Jan 2024 10:00:00 GMT</pubDate></item>
<item><title>Undated</title></item>
</channel></rss>"#;
        let items = parse_rss(3, xml.as_bytes(), 50, now()).unwrap();
        assert_eq!(items.len(), 2);

        let dated = items.iter().find(|i| i.title == "Lonely").unwrap();
        assert_eq!(dated.external_id, "3:Lonely:2024-01-15T10:00:00+00:00");

        let undated = items.iter().find(|i| i.title == "Undated").unwrap();
        assert_eq!(undated.external_id, "3:Undated:");
        assert_eq!(undated.published_at, now());
        assert_eq!(undated.link_url, "https://example.com/");
    }

    #[test]
    fn test_entry_without_any_link_skipped() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
<item><title>Nowhere</title><guid>g-nowhere</guid></item>
<item><title>Somewhere</title><guid>g-somewhere</guid><link>https://example.com/somewhere</link></item>
</channel></rss>"#;
        let items = parse_rss(3, xml.as_bytes(), 50, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "g-somewhere");
        assert_eq!(items[0].link_url, "https://example.com/somewhere");
    }

    #[test]
    fn test_atom_feed() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:uuid:feed</id>
  <updated>2024-01-16T12:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:uuid:entry-1</id>
    <link rel="alternate" href="https://example.com/atom-1"/>
    <updated>2024-01-16T12:00:00Z</updated>
    <summary>Short summary</summary>
    <author><name>Writer</name></author>
  </entry>
</feed>"#;
        let items = parse_rss(1, xml.as_bytes(), 50, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "urn:uuid:entry-1");
        assert_eq!(items[0].link_url, "https://example.com/atom-1");
        assert_eq!(items[0].author.as_deref(), Some("Writer"));
        assert_eq!(items[0].summary.as_deref(), Some("Short summary"));
        assert_eq!(
            items[0].published_at,
            Utc.with_ymd_and_hms(2024, 1, 16, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cap_keeps_newest() {
        let mut xml = String::from(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><link>https://example.com/</link>"#,
        );
        for day in 1..=9 {
            xml.push_str(&format!(
                "<item><title>Day {day}</title><guid>d{day}</guid><pubDate>0{day} Jan 2024 10:00:00 GMT</pubDate></item>"
            ));
        }
        xml.push_str("</channel></rss>");

        let items = parse_rss(1, xml.as_bytes(), 3, now()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.external_id.as_str()).collect();
        assert_eq!(ids, vec!["d9", "d8", "d7"]);
    }

    #[test]
    fn test_long_title_truncated() {
        let title = "t".repeat(600);
        let xml = format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><item><title>{title}</title><guid>g</guid><link>https://example.com/g</link></item></channel></rss>"#
        );
        let items = parse_rss(1, xml.as_bytes(), 50, now()).unwrap();
        assert_eq!(items[0].title, "t".repeat(500));
    }

    #[test]
    fn test_malformed_feed_is_parse_error() {
        let result = parse_rss(1, b"definitely not a feed", 50, now());
        assert!(result.is_err());
    }
}
