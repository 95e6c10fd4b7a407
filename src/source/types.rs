//! Source types for Feedloom.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::IngestError;

/// Maximum length of the stored `last_error` message.
pub const MAX_ERROR_LENGTH: usize = 1000;

/// Kind of content origin. Kinds partition the sources: every poller only
/// ever touches sources of its own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// RSS or Atom feed of a website.
    Rss,
    /// Public channel feed of a YouTube channel.
    YouTube,
    /// Verified posts from the internal content store.
    Internal,
}

impl SourceKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rss => "rss",
            SourceKind::YouTube => "youtube",
            SourceKind::Internal => "internal",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rss" => Ok(SourceKind::Rss),
            "youtube" => Ok(SourceKind::YouTube),
            "internal" => Ok(SourceKind::Internal),
            other => Err(IngestError::Validation(format!(
                "unknown source kind: {other}"
            ))),
        }
    }
}

/// A configured origin of content with its polling schedule.
#[derive(Debug, Clone)]
pub struct Source {
    /// Source ID.
    pub id: i64,
    /// Display name, used in log lines.
    pub name: String,
    /// Source kind.
    pub kind: SourceKind,
    /// Feed URL (RSS only).
    pub feed_url: Option<String>,
    /// Channel ID (YouTube only).
    pub channel_id: Option<String>,
    /// Fetch interval in seconds; 0 means unset.
    pub fetch_interval_seconds: i64,
    /// Legacy fetch interval in minutes; used when seconds is unset.
    pub fetch_interval_minutes: i64,
    /// Last clean fetch.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Next scheduled fetch. `None` means due immediately.
    pub next_fetch_at: Option<DateTime<Utc>>,
    /// `next_fetch_at` exactly as stored. Schedule writes compare against
    /// this text, whatever format the catalog used.
    pub schedule_token: Option<String>,
    /// Consecutive hard failures.
    pub error_count: i64,
    /// Last failure message.
    pub last_error: Option<String>,
    /// ETag returned by the last successful fetch.
    pub last_etag: Option<String>,
    /// Last-Modified returned by the last successful fetch.
    pub last_modified: Option<String>,
    /// Pagination cursor, reserved.
    pub cursor: Option<String>,
    /// Inactive sources are never selected.
    pub is_active: bool,
    /// When the source was registered.
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Whether the source is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_fetch_at.map_or(true, |next| next <= now)
    }
}

/// New source for creation.
#[derive(Debug, Clone)]
pub struct NewSource {
    /// Display name.
    pub name: String,
    /// Source kind.
    pub kind: SourceKind,
    /// Feed URL (RSS only).
    pub feed_url: Option<String>,
    /// Channel ID (YouTube only).
    pub channel_id: Option<String>,
    /// Fetch interval in seconds.
    pub fetch_interval_seconds: i64,
    /// Legacy fetch interval in minutes.
    pub fetch_interval_minutes: i64,
    /// Initial next fetch time. `None` makes the source due immediately.
    pub next_fetch_at: Option<DateTime<Utc>>,
    /// Whether the source is active.
    pub is_active: bool,
}

impl NewSource {
    fn base(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            feed_url: None,
            channel_id: None,
            fetch_interval_seconds: 0,
            fetch_interval_minutes: 0,
            next_fetch_at: None,
            is_active: true,
        }
    }

    /// Create an RSS/Atom source.
    pub fn rss(name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        let mut source = Self::base(name, SourceKind::Rss);
        source.feed_url = Some(feed_url.into());
        source
    }

    /// Create a YouTube channel source.
    pub fn youtube(name: impl Into<String>, channel_id: impl Into<String>) -> Self {
        let mut source = Self::base(name, SourceKind::YouTube);
        source.channel_id = Some(channel_id.into());
        source
    }

    /// Create an internal posts source.
    pub fn internal(name: impl Into<String>) -> Self {
        Self::base(name, SourceKind::Internal)
    }

    /// Set the fetch interval in seconds.
    pub fn with_fetch_interval_seconds(mut self, seconds: i64) -> Self {
        self.fetch_interval_seconds = seconds;
        self
    }

    /// Set the legacy fetch interval in minutes.
    pub fn with_fetch_interval_minutes(mut self, minutes: i64) -> Self {
        self.fetch_interval_minutes = minutes;
        self
    }

    /// Set the initial next fetch time.
    pub fn with_next_fetch_at(mut self, next_fetch_at: DateTime<Utc>) -> Self {
        self.next_fetch_at = Some(next_fetch_at);
        self
    }

    /// Register the source disabled.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check that the location matches the kind.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(IngestError::Validation("source name is empty".into()));
        }
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        match self.kind {
            SourceKind::Rss if !has(&self.feed_url) => Err(IngestError::Validation(
                "rss source requires a feed url".into(),
            )),
            SourceKind::YouTube if !has(&self.channel_id) => Err(IngestError::Validation(
                "youtube source requires a channel id".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Scheduling and caching fields written after one processing outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleUpdate {
    /// Set on clean cycles; `None` keeps the stored value.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Next due time.
    pub next_fetch_at: DateTime<Utc>,
    /// New consecutive failure count.
    pub error_count: i64,
    /// New failure message; `None` clears it.
    pub last_error: Option<String>,
    /// New ETag; `None` keeps the stored value.
    pub last_etag: Option<String>,
    /// New Last-Modified; `None` keeps the stored value.
    pub last_modified: Option<String>,
}
