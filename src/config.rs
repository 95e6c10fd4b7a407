//! Configuration module for Feedloom.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{IngestError, Result};

/// Lowest tick interval accepted for the RSS poller.
pub const MIN_RSS_TICK_SECS: u64 = 5;

/// Lowest tick interval accepted for the YouTube poller.
pub const MIN_YOUTUBE_TICK_SECS: u64 = 10;

/// Lowest tick interval accepted for the internal posts poller.
pub const MIN_INTERNAL_TICK_SECS: u64 = 5;

/// Lowest per-request timeout accepted for any fetch.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Resolve a tick interval from the seconds setting and its legacy minutes
/// counterpart. Seconds win when positive; the result never drops below
/// `floor_secs`.
pub fn resolve_tick_secs(seconds: u64, minutes: u64, floor_secs: u64) -> u64 {
    let secs = if seconds > 0 {
        seconds
    } else {
        minutes.saturating_mul(60)
    };
    secs.max(floor_secs)
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedloom.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty means stdout only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedloom.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// RSS/Atom poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RssIngestConfig {
    /// Whether the RSS poller runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds.
    #[serde(default = "default_rss_interval")]
    pub interval_seconds: u64,
    /// Legacy tick interval in minutes, used when `interval_seconds` is 0.
    #[serde(default)]
    pub interval_minutes: u64,
    /// Maximum number of due sources picked up per tick.
    #[serde(default = "default_rss_max_sources")]
    pub max_sources_per_run: usize,
    /// Maximum number of entries considered per source per tick.
    #[serde(default = "default_rss_max_items")]
    pub max_items_per_source: usize,
    /// Maximum number of fetches in flight at once.
    #[serde(default = "default_rss_parallel")]
    pub max_parallel_fetches: usize,
    /// Total request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// User agent sent with every request.
    #[serde(default = "default_rss_user_agent")]
    pub user_agent: String,
    /// Fetch interval for sources that configure none.
    #[serde(default = "default_rss_fetch_interval")]
    pub default_fetch_interval_secs: u64,
    /// Lowest per-source fetch interval.
    #[serde(default = "default_rss_min_fetch_interval")]
    pub min_fetch_interval_secs: u64,
    /// Upper bound for the failure backoff delay.
    #[serde(default = "default_rss_failure_cap")]
    pub failure_backoff_cap_secs: u64,
    /// Maximum accepted feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_rss_interval() -> u64 {
    60
}

fn default_rss_max_sources() -> usize {
    50
}

fn default_rss_max_items() -> usize {
    50
}

fn default_rss_parallel() -> usize {
    5
}

fn default_request_timeout() -> u64 {
    20
}

fn default_rss_user_agent() -> String {
    "Feedloom/0.1 (RSS ingest)".to_string()
}

fn default_rss_fetch_interval() -> u64 {
    900 // 15 minutes
}

fn default_rss_min_fetch_interval() -> u64 {
    60
}

fn default_rss_failure_cap() -> u64 {
    900 // 15 minutes
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for RssIngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_rss_interval(),
            interval_minutes: 0,
            max_sources_per_run: default_rss_max_sources(),
            max_items_per_source: default_rss_max_items(),
            max_parallel_fetches: default_rss_parallel(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_rss_user_agent(),
            default_fetch_interval_secs: default_rss_fetch_interval(),
            min_fetch_interval_secs: default_rss_min_fetch_interval(),
            failure_backoff_cap_secs: default_rss_failure_cap(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

impl RssIngestConfig {
    /// Effective tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(resolve_tick_secs(
            self.interval_seconds,
            self.interval_minutes,
            MIN_RSS_TICK_SECS,
        ))
    }

    /// Effective request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(MIN_REQUEST_TIMEOUT_SECS))
    }
}

/// YouTube channel poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeIngestConfig {
    /// Whether the YouTube poller runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds.
    #[serde(default = "default_youtube_interval")]
    pub interval_seconds: u64,
    /// Legacy tick interval in minutes, used when `interval_seconds` is 0.
    #[serde(default)]
    pub interval_minutes: u64,
    /// Maximum number of due channels picked up per tick.
    #[serde(default = "default_youtube_max_sources")]
    pub max_sources_per_run: usize,
    /// Maximum number of videos considered per channel per tick.
    #[serde(default = "default_youtube_max_items")]
    pub max_items_per_source: usize,
    /// Maximum number of fetches in flight at once.
    #[serde(default = "default_youtube_parallel")]
    pub max_parallel_fetches: usize,
    /// Total request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// User agent sent with every request.
    #[serde(default = "default_youtube_user_agent")]
    pub user_agent: String,
    /// Fetch interval for channels that configure none.
    #[serde(default = "default_youtube_fetch_interval")]
    pub default_fetch_interval_secs: u64,
    /// Lowest per-channel fetch interval.
    #[serde(default = "default_youtube_min_fetch_interval")]
    pub min_fetch_interval_secs: u64,
    /// Upper bound for the failure backoff delay.
    #[serde(default = "default_youtube_failure_cap")]
    pub failure_backoff_cap_secs: u64,
    /// Flat delay applied after a throttle response.
    #[serde(default = "default_youtube_throttle_backoff")]
    pub throttle_backoff_minutes: u64,
    /// Minimum gap between any two YouTube requests, process wide.
    #[serde(default = "default_youtube_request_delay")]
    pub min_request_delay_ms: u64,
    /// Upper bound of the random jitter added to successful schedules.
    #[serde(default = "default_youtube_jitter")]
    pub jitter_max_secs: u64,
    /// Channel feed endpoint; the channel id is appended as a query parameter.
    #[serde(default = "default_youtube_feed_base")]
    pub feed_base_url: String,
    /// Maximum accepted feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_youtube_interval() -> u64 {
    120
}

fn default_youtube_max_sources() -> usize {
    25
}

fn default_youtube_max_items() -> usize {
    15
}

fn default_youtube_parallel() -> usize {
    2
}

fn default_youtube_user_agent() -> String {
    "Mozilla/5.0 (compatible; Feedloom/0.1)".to_string()
}

fn default_youtube_fetch_interval() -> u64 {
    1800 // 30 minutes
}

fn default_youtube_min_fetch_interval() -> u64 {
    300
}

fn default_youtube_failure_cap() -> u64 {
    1800 // 30 minutes
}

fn default_youtube_throttle_backoff() -> u64 {
    30
}

fn default_youtube_request_delay() -> u64 {
    1500
}

fn default_youtube_jitter() -> u64 {
    10
}

fn default_youtube_feed_base() -> String {
    "https://www.youtube.com/feeds/videos.xml".to_string()
}

impl Default for YoutubeIngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_youtube_interval(),
            interval_minutes: 0,
            max_sources_per_run: default_youtube_max_sources(),
            max_items_per_source: default_youtube_max_items(),
            max_parallel_fetches: default_youtube_parallel(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_youtube_user_agent(),
            default_fetch_interval_secs: default_youtube_fetch_interval(),
            min_fetch_interval_secs: default_youtube_min_fetch_interval(),
            failure_backoff_cap_secs: default_youtube_failure_cap(),
            throttle_backoff_minutes: default_youtube_throttle_backoff(),
            min_request_delay_ms: default_youtube_request_delay(),
            jitter_max_secs: default_youtube_jitter(),
            feed_base_url: default_youtube_feed_base(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

impl YoutubeIngestConfig {
    /// Effective tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(resolve_tick_secs(
            self.interval_seconds,
            self.interval_minutes,
            MIN_YOUTUBE_TICK_SECS,
        ))
    }

    /// Effective request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(MIN_REQUEST_TIMEOUT_SECS))
    }

    /// Minimum gap between two requests.
    pub fn min_request_delay(&self) -> Duration {
        Duration::from_millis(self.min_request_delay_ms)
    }
}

/// Internal posts poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InternalIngestConfig {
    /// Whether the internal posts poller runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds.
    #[serde(default = "default_internal_interval")]
    pub interval_seconds: u64,
    /// Legacy tick interval in minutes, used when `interval_seconds` is 0.
    #[serde(default)]
    pub interval_minutes: u64,
    /// Maximum number of internal sources picked up per tick.
    #[serde(default = "default_internal_max_sources")]
    pub max_sources_per_run: usize,
    /// Maximum number of verified posts read per tick.
    #[serde(default = "default_internal_max_items")]
    pub max_items_per_source: usize,
    /// Fixed delay before an internal source is due again.
    #[serde(default = "default_internal_next_fetch")]
    pub next_fetch_secs: u64,
    /// Path prefix used to build post links.
    #[serde(default = "default_internal_link_base")]
    pub link_base_path: String,
}

fn default_internal_interval() -> u64 {
    60
}

fn default_internal_max_sources() -> usize {
    5
}

fn default_internal_max_items() -> usize {
    50
}

fn default_internal_next_fetch() -> u64 {
    120
}

fn default_internal_link_base() -> String {
    "/posts/".to_string()
}

impl Default for InternalIngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_internal_interval(),
            interval_minutes: 0,
            max_sources_per_run: default_internal_max_sources(),
            max_items_per_source: default_internal_max_items(),
            next_fetch_secs: default_internal_next_fetch(),
            link_base_path: default_internal_link_base(),
        }
    }
}

impl InternalIngestConfig {
    /// Effective tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(resolve_tick_secs(
            self.interval_seconds,
            self.interval_minutes,
            MIN_INTERNAL_TICK_SECS,
        ))
    }
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Whether the heartbeat task runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Heartbeat interval in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_seconds: u64,
}

fn default_heartbeat_interval() -> u64 {
    300
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_heartbeat_interval(),
        }
    }
}

/// Ingestion configuration, one section per source kind.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IngestConfig {
    /// RSS/Atom poller.
    #[serde(default)]
    pub rss: RssIngestConfig,
    /// YouTube poller.
    #[serde(default)]
    pub youtube: YoutubeIngestConfig,
    /// Internal posts poller.
    #[serde(default)]
    pub internal: InternalIngestConfig,
    /// Heartbeat task.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Ingestion configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(IngestError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| IngestError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDLOOM_DB_PATH`: database file path
    /// - `FEEDLOOM_LOG_LEVEL`: log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FEEDLOOM_DB_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var("FEEDLOOM_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(IngestError::Config("database.path must not be empty".into()));
        }
        if self.ingest.rss.enabled {
            if self.ingest.rss.user_agent.trim().is_empty() {
                return Err(IngestError::Config(
                    "ingest.rss.user_agent must not be empty".into(),
                ));
            }
            if self.ingest.rss.max_items_per_source == 0 {
                return Err(IngestError::Config(
                    "ingest.rss.max_items_per_source must be positive".into(),
                ));
            }
        }
        if self.ingest.youtube.enabled {
            if self.ingest.youtube.user_agent.trim().is_empty() {
                return Err(IngestError::Config(
                    "ingest.youtube.user_agent must not be empty".into(),
                ));
            }
            if self.ingest.youtube.max_items_per_source == 0 {
                return Err(IngestError::Config(
                    "ingest.youtube.max_items_per_source must be positive".into(),
                ));
            }
        }
        if self.ingest.internal.enabled && self.ingest.internal.max_items_per_source == 0 {
            return Err(IngestError::Config(
                "ingest.internal.max_items_per_source must be positive".into(),
            ));
        }
        Ok(())
    }
}
