//! Next-fetch computation after each processing outcome.
//!
//! Every transition takes `now` explicitly and returns the full
//! `ScheduleUpdate` to persist; nothing here touches storage.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::{InternalIngestConfig, RssIngestConfig, YoutubeIngestConfig};
use crate::feed::text::truncate_chars;
use crate::source::{ScheduleUpdate, Source, MAX_ERROR_LENGTH};

/// Smallest delay ever scheduled after a clean cycle.
pub const MIN_NEXT_FETCH_SECS: i64 = 5;

/// Failure backoff grows from this multiple of the interval.
const MIN_FAILURE_MULTIPLIER: i64 = 2;

/// Scheduling rules for one source kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Interval for sources that configure none.
    pub default_interval_secs: i64,
    /// Lowest accepted per-source interval.
    pub min_interval_secs: i64,
    /// Upper bound for the failure delay.
    pub failure_cap_secs: i64,
    /// Flat delay after a throttle signal. `None` treats throttling as a
    /// hard failure.
    pub throttle_backoff_secs: Option<i64>,
    /// Upper bound of the random delay added to clean cycles.
    pub jitter_max_secs: i64,
    /// Overrides the per-source interval entirely.
    pub fixed_interval_secs: Option<i64>,
}

impl BackoffPolicy {
    /// Policy for RSS/Atom sources.
    pub fn rss(config: &RssIngestConfig) -> Self {
        Self {
            default_interval_secs: config.default_fetch_interval_secs as i64,
            min_interval_secs: config.min_fetch_interval_secs as i64,
            failure_cap_secs: config.failure_backoff_cap_secs as i64,
            throttle_backoff_secs: None,
            jitter_max_secs: 0,
            fixed_interval_secs: None,
        }
    }

    /// Policy for YouTube channels.
    pub fn youtube(config: &YoutubeIngestConfig) -> Self {
        Self {
            default_interval_secs: config.default_fetch_interval_secs as i64,
            min_interval_secs: config.min_fetch_interval_secs as i64,
            failure_cap_secs: config.failure_backoff_cap_secs as i64,
            throttle_backoff_secs: Some(config.throttle_backoff_minutes as i64 * 60),
            jitter_max_secs: config.jitter_max_secs as i64,
            fixed_interval_secs: None,
        }
    }

    /// Policy for the internal posts source: always the same delay.
    pub fn internal(config: &InternalIngestConfig) -> Self {
        let fixed = config.next_fetch_secs as i64;
        Self {
            default_interval_secs: fixed,
            min_interval_secs: 0,
            failure_cap_secs: fixed,
            throttle_backoff_secs: None,
            jitter_max_secs: 0,
            fixed_interval_secs: Some(fixed),
        }
    }

    /// Effective interval for a source in seconds.
    ///
    /// Seconds win when positive, then the legacy minutes, then the kind's
    /// default; the result never drops below the kind's floor.
    pub fn resolve_interval(&self, source: &Source) -> i64 {
        if let Some(fixed) = self.fixed_interval_secs {
            return fixed.max(0);
        }

        let configured = if source.fetch_interval_seconds > 0 {
            source.fetch_interval_seconds
        } else if source.fetch_interval_minutes > 0 {
            source.fetch_interval_minutes.saturating_mul(60)
        } else {
            self.default_interval_secs
        };
        configured.max(self.min_interval_secs)
    }

    /// Clean cycle with fresh content.
    pub fn on_success(
        &self,
        source: &Source,
        now: DateTime<Utc>,
        etag: Option<String>,
        last_modified: Option<String>,
    ) -> ScheduleUpdate {
        let delay = (self.resolve_interval(source) + self.jitter()).max(MIN_NEXT_FETCH_SECS);
        ScheduleUpdate {
            last_fetched_at: Some(now),
            next_fetch_at: now + Duration::seconds(delay),
            error_count: 0,
            last_error: None,
            last_etag: etag,
            last_modified,
        }
    }

    /// Clean cycle where the origin reported no change.
    pub fn on_not_modified(&self, source: &Source, now: DateTime<Utc>) -> ScheduleUpdate {
        self.on_success(source, now, None, None)
    }

    /// Failed cycle: capped backoff growing with the failure count.
    pub fn on_hard_failure(&self, source: &Source, now: DateTime<Utc>, error: &str) -> ScheduleUpdate {
        let error_count = source.error_count.max(0) + 1;
        let delay = self
            .resolve_interval(source)
            .saturating_mul(error_count.max(MIN_FAILURE_MULTIPLIER))
            .min(self.failure_cap_secs)
            .max(MIN_NEXT_FETCH_SECS);

        ScheduleUpdate {
            last_fetched_at: None,
            next_fetch_at: now + Duration::seconds(delay),
            error_count,
            last_error: Some(truncate_chars(error, MAX_ERROR_LENGTH)),
            last_etag: None,
            last_modified: None,
        }
    }

    /// The origin asked us to slow down.
    ///
    /// With a throttle delay configured the failure count is left alone and
    /// the delay is flat; otherwise this is a hard failure.
    pub fn on_throttled(&self, source: &Source, now: DateTime<Utc>, reason: &str) -> ScheduleUpdate {
        match self.throttle_backoff_secs {
            Some(backoff) => ScheduleUpdate {
                last_fetched_at: None,
                next_fetch_at: now + Duration::seconds(backoff.max(MIN_NEXT_FETCH_SECS)),
                error_count: source.error_count,
                last_error: Some(truncate_chars(reason, MAX_ERROR_LENGTH)),
                last_etag: None,
                last_modified: None,
            },
            None => self.on_hard_failure(source, now, reason),
        }
    }

    fn jitter(&self) -> i64 {
        if self.jitter_max_secs > 0 {
            rand::rng().random_range(0..=self.jitter_max_secs)
        } else {
            0
        }
    }
}
