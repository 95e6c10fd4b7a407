//! Per-kind source strategies.
//!
//! The orchestrator is written once against `SourceStrategy`; each kind
//! plugs in how it reaches its origin, how it parses the payload and which
//! backoff rules apply.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use super::backoff::BackoffPolicy;
use super::fetcher::{FeedFetcher, FetchOutcome, FetchRequest};
use super::pacing::RequestGate;
use super::parse::{parse_posts, parse_rss, parse_youtube};
use crate::db::Database;
use crate::feed::NewFeedItem;
use crate::post::PostRepository;
use crate::source::{Source, SourceKind};
use crate::{IngestError, Result};

/// Where a source's content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTarget {
    /// RSS/Atom document URL.
    Rss {
        /// Feed URL.
        url: String,
    },
    /// YouTube channel.
    YouTube {
        /// Channel id.
        channel_id: String,
    },
    /// The internal content store.
    Internal,
}

impl SourceTarget {
    /// Derive the target from a stored source.
    pub fn from_source(source: &Source) -> Result<Self> {
        let location = |value: &Option<String>, what: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    IngestError::Validation(format!("source {} has no {what}", source.id))
                })
        };

        Ok(match source.kind {
            SourceKind::Rss => SourceTarget::Rss {
                url: location(&source.feed_url, "feed url")?,
            },
            SourceKind::YouTube => SourceTarget::YouTube {
                channel_id: location(&source.channel_id, "channel id")?,
            },
            SourceKind::Internal => SourceTarget::Internal,
        })
    }
}

/// Cache validators returned with fresh content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    /// `ETag` header.
    pub etag: Option<String>,
    /// `Last-Modified` header.
    pub last_modified: Option<String>,
}

/// Outcome of fetching and parsing one source.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// New payload, parsed into candidates.
    Fresh {
        /// Candidates, newest first and capped.
        items: Vec<NewFeedItem>,
        /// Validators to persist.
        validators: Validators,
    },
    /// The origin reported no change.
    NotModified,
    /// The origin asked us to back off.
    Throttled {
        /// Human-readable reason, stored as the source's last error.
        reason: String,
    },
}

/// Kind-specific part of processing one source.
#[async_trait]
pub trait SourceStrategy: Send + Sync {
    /// Kind of sources this strategy handles.
    fn kind(&self) -> SourceKind;

    /// Scheduling rules for this kind.
    fn policy(&self) -> &BackoffPolicy;

    /// Fetch and parse one source. Errors are hard failures for the source.
    async fn fetch_and_parse(&self, source: &Source, now: DateTime<Utc>) -> Result<FetchResult>;
}

/// Map a fetch outcome onto a strategy result, parsing fresh bodies.
fn interpret<F>(outcome: FetchOutcome, parse: F) -> Result<FetchResult>
where
    F: FnOnce(&[u8]) -> Result<Vec<NewFeedItem>>,
{
    match outcome {
        FetchOutcome::NotModified => Ok(FetchResult::NotModified),
        FetchOutcome::Throttled {
            status,
            retry_after,
        } => {
            let reason = match retry_after {
                Some(hint) => format!("throttled: HTTP {status} (retry after {hint})"),
                None => format!("throttled: HTTP {status}"),
            };
            Ok(FetchResult::Throttled { reason })
        }
        FetchOutcome::HttpError { status, body } => Err(IngestError::HttpStatus { status, body }),
        FetchOutcome::Success {
            body,
            etag,
            last_modified,
        } => Ok(FetchResult::Fresh {
            items: parse(&body)?,
            validators: Validators {
                etag,
                last_modified,
            },
        }),
    }
}

/// RSS/Atom sources.
pub struct RssStrategy {
    fetcher: Arc<dyn FeedFetcher>,
    policy: BackoffPolicy,
    max_items: usize,
}

impl RssStrategy {
    /// Create the strategy.
    pub fn new(fetcher: Arc<dyn FeedFetcher>, policy: BackoffPolicy, max_items: usize) -> Self {
        Self {
            fetcher,
            policy,
            max_items,
        }
    }
}

#[async_trait]
impl SourceStrategy for RssStrategy {
    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    async fn fetch_and_parse(&self, source: &Source, now: DateTime<Utc>) -> Result<FetchResult> {
        let SourceTarget::Rss { url } = SourceTarget::from_source(source)? else {
            return Err(IngestError::Validation(format!(
                "source {} is not an rss source",
                source.id
            )));
        };

        let request = FetchRequest::new(url)
            .with_validators(source.last_etag.clone(), source.last_modified.clone());
        let outcome = self.fetcher.fetch(&request).await?;

        interpret(outcome, |body| parse_rss(source.id, body, self.max_items, now))
    }
}

/// YouTube channel sources.
pub struct YouTubeStrategy {
    fetcher: Arc<dyn FeedFetcher>,
    gate: Arc<dyn RequestGate>,
    policy: BackoffPolicy,
    max_items: usize,
    feed_base_url: String,
}

impl YouTubeStrategy {
    /// Create the strategy. `gate` is shared by every YouTube request in the
    /// process.
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        gate: Arc<dyn RequestGate>,
        policy: BackoffPolicy,
        max_items: usize,
        feed_base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            gate,
            policy,
            max_items,
            feed_base_url: feed_base_url.into(),
        }
    }

    /// Channel feed URL for a channel id.
    pub fn feed_url(&self, channel_id: &str) -> Result<String> {
        Url::parse_with_params(&self.feed_base_url, &[("channel_id", channel_id)])
            .map(String::from)
            .map_err(|e| IngestError::Config(format!("invalid youtube feed base url: {e}")))
    }
}

#[async_trait]
impl SourceStrategy for YouTubeStrategy {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    async fn fetch_and_parse(&self, source: &Source, now: DateTime<Utc>) -> Result<FetchResult> {
        let SourceTarget::YouTube { channel_id } = SourceTarget::from_source(source)? else {
            return Err(IngestError::Validation(format!(
                "source {} is not a youtube source",
                source.id
            )));
        };

        let request = FetchRequest::new(self.feed_url(&channel_id)?)
            .with_validators(source.last_etag.clone(), source.last_modified.clone());

        self.gate.wait().await;
        let outcome = self.fetcher.fetch(&request).await?;

        interpret(outcome, |body| parse_youtube(source.id, body, self.max_items, now))
    }
}

/// The internal posts source. Reads the catalog, no network.
pub struct InternalStrategy {
    db: Database,
    policy: BackoffPolicy,
    max_items: usize,
    link_base_path: String,
}

impl InternalStrategy {
    /// Create the strategy.
    pub fn new(
        db: Database,
        policy: BackoffPolicy,
        max_items: usize,
        link_base_path: impl Into<String>,
    ) -> Self {
        Self {
            db,
            policy,
            max_items,
            link_base_path: link_base_path.into(),
        }
    }
}

#[async_trait]
impl SourceStrategy for InternalStrategy {
    fn kind(&self) -> SourceKind {
        SourceKind::Internal
    }

    fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    async fn fetch_and_parse(&self, source: &Source, _now: DateTime<Utc>) -> Result<FetchResult> {
        let posts = PostRepository::new(self.db.pool())
            .list_verified(self.max_items)
            .await?;
        debug!(source_id = source.id, posts = posts.len(), "read verified posts");

        Ok(FetchResult::Fresh {
            items: parse_posts(source.id, &posts, &self.link_base_path),
            validators: Validators::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RssIngestConfig, YoutubeIngestConfig};
    use crate::ingest::pacing::MinIntervalGate;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Returns a fixed outcome and remembers the requests it saw.
    struct ScriptedFetcher {
        outcome: FetchOutcome,
        seen: Mutex<Vec<FetchRequest>>,
    }

    impl ScriptedFetcher {
        fn new(outcome: FetchOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FeedFetcher for ScriptedFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.outcome.clone())
        }
    }

    fn source(kind: SourceKind) -> Source {
        Source {
            id: 3,
            name: "Example".to_string(),
            kind,
            feed_url: Some("https://example.com/feed.xml".to_string()),
            channel_id: Some("UCexample".to_string()),
            fetch_interval_seconds: 60,
            fetch_interval_minutes: 0,
            last_fetched_at: None,
            next_fetch_at: None,
            schedule_token: None,
            error_count: 0,
            last_error: None,
            last_etag: Some("\"abc\"".to_string()),
            last_modified: None,
            cursor: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    const RSS: &str = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>
<item><title>One</title><guid>g1</guid><link>https://example.com/g1</link></item></channel></rss>"#;

    #[test]
    fn test_target_from_source() {
        assert_eq!(
            SourceTarget::from_source(&source(SourceKind::Rss)).unwrap(),
            SourceTarget::Rss {
                url: "https://example.com/feed.xml".to_string()
            }
        );
        assert_eq!(
            SourceTarget::from_source(&source(SourceKind::Internal)).unwrap(),
            SourceTarget::Internal
        );

        let mut missing = source(SourceKind::YouTube);
        missing.channel_id = None;
        assert!(SourceTarget::from_source(&missing).is_err());
    }

    #[tokio::test]
    async fn test_rss_sends_validators_and_parses() {
        let fetcher = ScriptedFetcher::new(FetchOutcome::Success {
            body: Bytes::from_static(RSS.as_bytes()),
            etag: Some("\"def\"".to_string()),
            last_modified: None,
        });
        let strategy = RssStrategy::new(
            fetcher.clone(),
            BackoffPolicy::rss(&RssIngestConfig::default()),
            50,
        );

        let result = strategy
            .fetch_and_parse(&source(SourceKind::Rss), Utc::now())
            .await
            .unwrap();

        let FetchResult::Fresh { items, validators } = result else {
            panic!("expected fresh content");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "g1");
        assert_eq!(validators.etag.as_deref(), Some("\"def\""));

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen[0].url, "https://example.com/feed.xml");
        assert_eq!(seen[0].etag.as_deref(), Some("\"abc\""));
    }

    #[tokio::test]
    async fn test_http_error_is_hard_failure() {
        let fetcher = ScriptedFetcher::new(FetchOutcome::HttpError {
            status: 500,
            body: "boom".to_string(),
        });
        let strategy = RssStrategy::new(fetcher, BackoffPolicy::rss(&RssIngestConfig::default()), 50);

        let result = strategy
            .fetch_and_parse(&source(SourceKind::Rss), Utc::now())
            .await;
        assert!(matches!(
            result,
            Err(IngestError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let fetcher = ScriptedFetcher::new(FetchOutcome::Success {
            body: Bytes::from_static(b"definitely not a feed"),
            etag: None,
            last_modified: None,
        });
        let strategy = RssStrategy::new(fetcher, BackoffPolicy::rss(&RssIngestConfig::default()), 50);

        let result = strategy
            .fetch_and_parse(&source(SourceKind::Rss), Utc::now())
            .await;
        assert!(matches!(result, Err(IngestError::Parse(_))));
    }

    #[tokio::test]
    async fn test_youtube_throttle_reason() {
        let fetcher = ScriptedFetcher::new(FetchOutcome::Throttled {
            status: 429,
            retry_after: Some("120".to_string()),
        });
        let strategy = YouTubeStrategy::new(
            fetcher.clone(),
            Arc::new(MinIntervalGate::disabled()),
            BackoffPolicy::youtube(&YoutubeIngestConfig::default()),
            15,
            "https://www.youtube.com/feeds/videos.xml",
        );

        let result = strategy
            .fetch_and_parse(&source(SourceKind::YouTube), Utc::now())
            .await
            .unwrap();
        assert_eq!(
            result,
            FetchResult::Throttled {
                reason: "throttled: HTTP 429 (retry after 120)".to_string()
            }
        );

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(
            seen[0].url,
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCexample"
        );
    }

    #[tokio::test]
    async fn test_not_modified_passes_through() {
        let fetcher = ScriptedFetcher::new(FetchOutcome::NotModified);
        let strategy = RssStrategy::new(fetcher, BackoffPolicy::rss(&RssIngestConfig::default()), 50);
        let result = strategy
            .fetch_and_parse(&source(SourceKind::Rss), Utc::now())
            .await
            .unwrap();
        assert_eq!(result, FetchResult::NotModified);
    }

    #[tokio::test]
    async fn test_internal_reads_verified_posts() {
        use crate::config::InternalIngestConfig;
        use crate::post::NewPost;

        let db = Database::open_in_memory().await.unwrap();
        let posts = PostRepository::new(db.pool());
        posts.create(&NewPost::new("Visible", "body").verified()).await.unwrap();
        posts.create(&NewPost::new("Hidden", "body")).await.unwrap();

        let strategy = InternalStrategy::new(
            db.clone(),
            BackoffPolicy::internal(&InternalIngestConfig::default()),
            50,
            "/posts/",
        );
        let result = strategy
            .fetch_and_parse(&source(SourceKind::Internal), Utc::now())
            .await
            .unwrap();

        let FetchResult::Fresh { items, .. } = result else {
            panic!("expected fresh content");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Visible");
        assert!(items[0].external_id.starts_with("post-"));
    }
}
