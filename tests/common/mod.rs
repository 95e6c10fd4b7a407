//! Test helpers for integration tests.
//!
//! Provides database setup, feed fixtures and a scripted `FeedFetcher`.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use feedloom::config::{RssIngestConfig, YoutubeIngestConfig};
use feedloom::ingest::{
    BackoffPolicy, FeedFetcher, FetchOutcome, FetchRequest, IngestStats, MinIntervalGate,
    Orchestrator, OrchestratorSettings, RequestGate, RssStrategy, YouTubeStrategy,
};
use feedloom::{Database, NewSource, Result, Source, SourceRepository};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// YouTube feed base used by the test strategies.
pub const YOUTUBE_BASE: &str = "https://www.youtube.com/feeds/videos.xml";

/// Open an empty in-memory catalog.
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Register an RSS source that is due immediately.
pub async fn create_rss_source(db: &Database, name: &str, interval_secs: i64) -> Source {
    SourceRepository::new(db.pool())
        .create(
            &NewSource::rss(name, feed_url(name)).with_fetch_interval_seconds(interval_secs),
        )
        .await
        .unwrap()
}

/// Register a YouTube source that is due immediately.
pub async fn create_youtube_source(db: &Database, name: &str, channel_id: &str) -> Source {
    SourceRepository::new(db.pool())
        .create(&NewSource::youtube(name, channel_id))
        .await
        .unwrap()
}

/// Feed URL used for a named test source.
pub fn feed_url(name: &str) -> String {
    format!("https://feeds.example.com/{name}.xml")
}

/// Channel feed URL the YouTube strategy requests for `channel_id`.
pub fn youtube_feed_url(channel_id: &str) -> String {
    format!("{YOUTUBE_BASE}?channel_id={channel_id}")
}

/// Make a source due again without going through a tick.
pub async fn make_due(db: &Database, source_id: i64) {
    sqlx::query("UPDATE sources SET next_fetch_at = NULL WHERE id = $1")
        .bind(source_id)
        .execute(db.pool())
        .await
        .unwrap();
}

/// Reload a source.
pub async fn reload(db: &Database, source_id: i64) -> Source {
    SourceRepository::new(db.pool())
        .get_by_id(source_id)
        .await
        .unwrap()
        .unwrap()
}

/// RSS 2.0 document with one item per `(guid, title)`.
pub fn rss_feed(items: &[(&str, &str)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
<title>Example News</title>
<link>https://news.example.com/</link>
<description>Test feed</description>
"#,
    );
    for (guid, title) in items {
        body.push_str(&format!(
            r#"<item>
<title>{title}</title>
<link>https://news.example.com/{guid}</link>
<guid>{guid}</guid>
<description>&lt;p&gt;About {title}&lt;/p&gt;</description>
</item>
"#
        ));
    }
    body.push_str("</channel>\n</rss>\n");
    body
}

/// YouTube channel feed with one entry per `(video_id, title)`.
pub fn youtube_feed(channel: &str, videos: &[(&str, &str)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
<id>yt:channel:{channel}</id>
<title>{channel}</title>
<author><name>{channel}</name></author>
"#
    );
    for (video_id, title) in videos {
        body.push_str(&format!(
            r#"<entry>
<id>yt:video:{video_id}</id>
<yt:videoId>{video_id}</yt:videoId>
<title>{title}</title>
<link rel="alternate" href="https://www.youtube.com/watch?v={video_id}"/>
<published>2024-01-02T10:00:00+00:00</published>
<media:group>
<media:title>{title}</media:title>
<media:thumbnail url="https://i.ytimg.com/vi/{video_id}/hqdefault.jpg" width="480" height="360"/>
<media:description>Video {title}</media:description>
</media:group>
</entry>
"#
        ));
    }
    body.push_str("</feed>\n");
    body
}

/// Successful response carrying `body`.
pub fn success(body: String, etag: Option<&str>) -> FetchOutcome {
    FetchOutcome::Success {
        body: Bytes::from(body),
        etag: etag.map(str::to_string),
        last_modified: None,
    }
}

/// `FeedFetcher` double answering from per-URL queues.
///
/// When a URL's queue is empty the default outcome is returned. Tracks the
/// number of concurrent calls and when each call was made.
pub struct ScriptedFetcher {
    queues: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    default: FetchOutcome,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<(Instant, FetchRequest)>>,
}

impl ScriptedFetcher {
    /// Fetcher answering `default` to every request.
    pub fn new(default: FetchOutcome) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            default,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue an outcome for `url`.
    pub fn push(&self, url: impl Into<String>, outcome: FetchOutcome) {
        self.queues
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(outcome);
    }

    /// Highest number of calls observed at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Arrival time of each request.
    pub fn arrivals(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front);
        Ok(queued.unwrap_or_else(|| self.default.clone()))
    }
}

/// RSS orchestrator over `fetcher` with default RSS rules.
pub fn rss_orchestrator(
    db: &Database,
    fetcher: Arc<dyn FeedFetcher>,
    max_parallel: usize,
) -> Orchestrator {
    let config = RssIngestConfig::default();
    Orchestrator::new(
        db.clone(),
        Arc::new(RssStrategy::new(
            fetcher,
            BackoffPolicy::rss(&config),
            config.max_items_per_source,
        )),
        OrchestratorSettings::new(config.tick_interval(), 50, max_parallel),
        Arc::new(IngestStats::new()),
    )
}

/// YouTube orchestrator over `fetcher`, pacing requests `min_delay` apart.
pub fn youtube_orchestrator(
    db: &Database,
    fetcher: Arc<dyn FeedFetcher>,
    min_delay: Duration,
    max_parallel: usize,
) -> Orchestrator {
    let config = YoutubeIngestConfig::default();
    let gate: Arc<dyn RequestGate> = Arc::new(MinIntervalGate::new(min_delay));
    Orchestrator::new(
        db.clone(),
        Arc::new(YouTubeStrategy::new(
            fetcher,
            gate,
            BackoffPolicy::youtube(&config),
            config.max_items_per_source,
            YOUTUBE_BASE,
        )),
        OrchestratorSettings::new(config.tick_interval(), 50, max_parallel),
        Arc::new(IngestStats::new()),
    )
}
