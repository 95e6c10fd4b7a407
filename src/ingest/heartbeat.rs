//! Periodic liveness log line.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::stats::IngestStats;

/// Log a summary of the ingestion counters every `period` until cancelled.
pub async fn run_heartbeat(stats: Arc<IngestStats>, period: Duration, cancel: CancellationToken) {
    let mut timer = interval(period.max(Duration::from_secs(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    timer.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = timer.tick() => {
                let s = stats.snapshot();
                info!(
                    uptime_secs = s.uptime.as_secs(),
                    rss_items = s.rss.items_added,
                    rss_failures = s.rss.failures,
                    youtube_items = s.youtube.items_added,
                    youtube_failures = s.youtube.failures,
                    youtube_throttled = s.youtube.throttled,
                    internal_items = s.internal.items_added,
                    "ingest heartbeat"
                );
            }
        }
    }

    info!("heartbeat stopped");
}
