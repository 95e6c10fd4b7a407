//! In-process ingestion counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::source::SourceKind;

/// Counters for one source kind.
#[derive(Debug, Default)]
pub struct KindCounters {
    ticks: AtomicU64,
    sources_processed: AtomicU64,
    items_added: AtomicU64,
    failures: AtomicU64,
    throttled: AtomicU64,
    not_modified: AtomicU64,
}

/// Point-in-time copy of `KindCounters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSnapshot {
    /// Completed ticks.
    pub ticks: u64,
    /// Sources that reached an outcome.
    pub sources_processed: u64,
    /// Feed items inserted.
    pub items_added: u64,
    /// Hard failures.
    pub failures: u64,
    /// Throttle signals.
    pub throttled: u64,
    /// Unchanged responses.
    pub not_modified: u64,
}

impl KindCounters {
    fn snapshot(&self) -> KindSnapshot {
        KindSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            sources_processed: self.sources_processed.load(Ordering::Relaxed),
            items_added: self.items_added.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            not_modified: self.not_modified.load(Ordering::Relaxed),
        }
    }
}

/// Counters shared by every orchestrator and the heartbeat.
#[derive(Debug)]
pub struct IngestStats {
    started_at: Instant,
    rss: KindCounters,
    youtube: KindCounters,
    internal: KindCounters,
}

/// Point-in-time copy of `IngestStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the stats were created.
    pub uptime: Duration,
    /// RSS counters.
    pub rss: KindSnapshot,
    /// YouTube counters.
    pub youtube: KindSnapshot,
    /// Internal posts counters.
    pub internal: KindSnapshot,
}

impl StatsSnapshot {
    /// Items added across all kinds.
    pub fn total_items_added(&self) -> u64 {
        self.rss.items_added + self.youtube.items_added + self.internal.items_added
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            rss: KindCounters::default(),
            youtube: KindCounters::default(),
            internal: KindCounters::default(),
        }
    }

    fn counters(&self, kind: SourceKind) -> &KindCounters {
        match kind {
            SourceKind::Rss => &self.rss,
            SourceKind::YouTube => &self.youtube,
            SourceKind::Internal => &self.internal,
        }
    }

    /// Count a finished tick.
    pub fn record_tick(&self, kind: SourceKind) {
        self.counters(kind).ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a source that produced fresh content.
    pub fn record_success(&self, kind: SourceKind, items_added: usize) {
        let counters = self.counters(kind);
        counters.sources_processed.fetch_add(1, Ordering::Relaxed);
        counters
            .items_added
            .fetch_add(items_added as u64, Ordering::Relaxed);
    }

    /// Count an unchanged source.
    pub fn record_not_modified(&self, kind: SourceKind) {
        let counters = self.counters(kind);
        counters.sources_processed.fetch_add(1, Ordering::Relaxed);
        counters.not_modified.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a throttled source.
    pub fn record_throttled(&self, kind: SourceKind) {
        let counters = self.counters(kind);
        counters.sources_processed.fetch_add(1, Ordering::Relaxed);
        counters.throttled.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a hard failure.
    pub fn record_failure(&self, kind: SourceKind) {
        let counters = self.counters(kind);
        counters.sources_processed.fetch_add(1, Ordering::Relaxed);
        counters.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters for one kind.
    pub fn kind_snapshot(&self, kind: SourceKind) -> KindSnapshot {
        self.counters(kind).snapshot()
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            rss: self.rss.snapshot(),
            youtube: self.youtube.snapshot(),
            internal: self.internal.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_kind() {
        let stats = IngestStats::new();
        stats.record_success(SourceKind::Rss, 3);
        stats.record_success(SourceKind::Rss, 2);
        stats.record_failure(SourceKind::YouTube);
        stats.record_throttled(SourceKind::YouTube);
        stats.record_not_modified(SourceKind::Internal);
        stats.record_tick(SourceKind::Rss);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rss.items_added, 5);
        assert_eq!(snapshot.rss.sources_processed, 2);
        assert_eq!(snapshot.rss.ticks, 1);
        assert_eq!(snapshot.youtube.failures, 1);
        assert_eq!(snapshot.youtube.throttled, 1);
        assert_eq!(snapshot.youtube.sources_processed, 2);
        assert_eq!(snapshot.internal.not_modified, 1);
        assert_eq!(snapshot.total_items_added(), 5);
    }

    #[test]
    fn test_kind_snapshot() {
        let stats = IngestStats::default();
        assert_eq!(stats.kind_snapshot(SourceKind::Internal), KindSnapshot::default());
    }
}
