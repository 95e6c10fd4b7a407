//! Wires the per-kind loops from configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::backoff::BackoffPolicy;
use super::fetcher::{FetcherSettings, HttpFetcher};
use super::heartbeat::run_heartbeat;
use super::orchestrator::{Orchestrator, OrchestratorSettings};
use super::pacing::MinIntervalGate;
use super::stats::IngestStats;
use super::strategy::{InternalStrategy, RssStrategy, YouTubeStrategy};
use crate::config::Config;
use crate::db::Database;
use crate::source::SourceKind;
use crate::Result;

/// All ingestion loops of the process.
pub struct IngestService {
    orchestrators: Vec<Orchestrator>,
    stats: Arc<IngestStats>,
    heartbeat_interval: Option<Duration>,
}

impl IngestService {
    /// Build the enabled loops.
    pub fn from_config(config: &Config, db: Database) -> Result<Self> {
        let ingest = &config.ingest;
        let stats = Arc::new(IngestStats::new());
        let mut orchestrators = Vec::new();

        if ingest.rss.enabled {
            let fetcher = Arc::new(HttpFetcher::new(FetcherSettings::rss(&ingest.rss))?);
            let strategy = RssStrategy::new(
                fetcher,
                BackoffPolicy::rss(&ingest.rss),
                ingest.rss.max_items_per_source,
            );
            orchestrators.push(Orchestrator::new(
                db.clone(),
                Arc::new(strategy),
                OrchestratorSettings::rss(&ingest.rss),
                stats.clone(),
            ));
        }

        if ingest.youtube.enabled {
            let fetcher = Arc::new(HttpFetcher::new(FetcherSettings::youtube(&ingest.youtube))?);
            let gate = Arc::new(MinIntervalGate::new(ingest.youtube.min_request_delay()));
            let strategy = YouTubeStrategy::new(
                fetcher,
                gate,
                BackoffPolicy::youtube(&ingest.youtube),
                ingest.youtube.max_items_per_source,
                ingest.youtube.feed_base_url.clone(),
            );
            orchestrators.push(Orchestrator::new(
                db.clone(),
                Arc::new(strategy),
                OrchestratorSettings::youtube(&ingest.youtube),
                stats.clone(),
            ));
        }

        if ingest.internal.enabled {
            let strategy = InternalStrategy::new(
                db.clone(),
                BackoffPolicy::internal(&ingest.internal),
                ingest.internal.max_items_per_source,
                ingest.internal.link_base_path.clone(),
            );
            orchestrators.push(Orchestrator::new(
                db.clone(),
                Arc::new(strategy),
                OrchestratorSettings::internal(&ingest.internal),
                stats.clone(),
            ));
        }

        let heartbeat_interval = ingest
            .heartbeat
            .enabled
            .then(|| Duration::from_secs(ingest.heartbeat.interval_seconds));

        Ok(Self {
            orchestrators,
            stats,
            heartbeat_interval,
        })
    }

    /// Kinds with a running loop, in start order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.orchestrators.iter().map(Orchestrator::kind).collect()
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    /// Start every loop. Each handle finishes after `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        info!(loops = self.orchestrators.len(), "starting ingest service");

        let mut handles: Vec<JoinHandle<()>> = self
            .orchestrators
            .into_iter()
            .map(|orchestrator| tokio::spawn(orchestrator.run(cancel.clone())))
            .collect();

        if let Some(period) = self.heartbeat_interval {
            handles.push(tokio::spawn(run_heartbeat(self.stats, period, cancel)));
        }

        handles
    }
}
