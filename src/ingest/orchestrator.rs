//! Per-kind tick loop.
//!
//! Each tick selects the due sources of one kind and processes them under a
//! semaphore. A unit never affects its siblings: errors and panics become the
//! source's failure state, cancellation abandons the unit without touching
//! its schedule.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dedupe::DedupeEngine;
use super::stats::IngestStats;
use super::strategy::{FetchResult, SourceStrategy, Validators};
use crate::config::{InternalIngestConfig, RssIngestConfig, YoutubeIngestConfig};
use crate::db::Database;
use crate::source::{ScheduleUpdate, Source, SourceKind, SourceRepository};
use crate::Result;

/// Length of the run id attached to a tick's log lines.
const RUN_ID_LENGTH: usize = 8;

/// Tick loop settings for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Time between tick starts.
    pub tick_interval: Duration,
    /// Cap on sources selected per tick.
    pub max_sources_per_run: usize,
    /// Units processed at the same time.
    pub max_parallel: usize,
}

impl OrchestratorSettings {
    /// Create settings; counts are raised to at least one.
    pub fn new(tick_interval: Duration, max_sources_per_run: usize, max_parallel: usize) -> Self {
        Self {
            tick_interval,
            max_sources_per_run: max_sources_per_run.max(1),
            max_parallel: max_parallel.max(1),
        }
    }

    /// Settings for the RSS loop.
    pub fn rss(config: &RssIngestConfig) -> Self {
        Self::new(
            config.tick_interval(),
            config.max_sources_per_run,
            config.max_parallel_fetches,
        )
    }

    /// Settings for the YouTube loop.
    pub fn youtube(config: &YoutubeIngestConfig) -> Self {
        Self::new(
            config.tick_interval(),
            config.max_sources_per_run,
            config.max_parallel_fetches,
        )
    }

    /// Settings for the internal posts loop. Units run one at a time.
    pub fn internal(config: &InternalIngestConfig) -> Self {
        Self::new(config.tick_interval(), config.max_sources_per_run, 1)
    }
}

/// Aggregate result of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Correlation id of the tick.
    pub run_id: String,
    /// Sources selected.
    pub due: usize,
    /// Sources with fresh content.
    pub succeeded: usize,
    /// Sources reporting no change.
    pub not_modified: usize,
    /// Sources that were throttled.
    pub throttled: usize,
    /// Sources with a hard failure.
    pub failed: usize,
    /// Units abandoned on shutdown.
    pub cancelled: usize,
    /// Feed items inserted.
    pub items_added: usize,
}

/// Outcome of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Fresh { added: usize },
    NotModified,
    Throttled,
    Failed,
    Cancelled,
}

/// What a unit did before its schedule is written.
enum Processed {
    Fresh { added: usize, validators: Validators },
    NotModified,
    Throttled { reason: String },
}

/// Drives the tick loop of one source kind.
#[derive(Clone)]
pub struct Orchestrator {
    db: Database,
    strategy: Arc<dyn SourceStrategy>,
    settings: OrchestratorSettings,
    stats: Arc<IngestStats>,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(
        db: Database,
        strategy: Arc<dyn SourceStrategy>,
        settings: OrchestratorSettings,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            db,
            strategy,
            settings,
            stats,
        }
    }

    /// Kind handled by this orchestrator.
    pub fn kind(&self) -> SourceKind {
        self.strategy.kind()
    }

    /// Settings in use.
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run ticks until `cancel` fires.
    ///
    /// Ticks start on a fixed period; a tick that overruns skips the missed
    /// periods instead of stacking. Errors and panics escaping a tick are
    /// logged and the loop continues.
    pub async fn run(self, cancel: CancellationToken) {
        let kind = self.kind();
        info!(
            kind = %kind,
            interval_secs = self.settings.tick_interval.as_secs(),
            max_sources = self.settings.max_sources_per_run,
            max_parallel = self.settings.max_parallel,
            "ingest loop started"
        );

        let mut timer = interval(self.settings.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            match AssertUnwindSafe(self.run_tick(&cancel)).catch_unwind().await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(kind = %kind, error = %e, "ingest tick failed"),
                Err(panic) => error!(
                    kind = %kind,
                    panic = %panic_message(panic.as_ref()),
                    "ingest tick panicked"
                ),
            }
        }

        info!(kind = %kind, "ingest loop stopped");
    }

    /// Run a single tick and wait for every unit to finish.
    pub async fn run_tick(&self, cancel: &CancellationToken) -> Result<TickReport> {
        let kind = self.kind();
        let run_id = new_run_id();
        let mut report = TickReport {
            run_id: run_id.clone(),
            ..TickReport::default()
        };

        if cancel.is_cancelled() {
            return Ok(report);
        }

        let due = SourceRepository::new(self.db.pool())
            .list_due(kind, Utc::now(), self.settings.max_sources_per_run)
            .await?;
        report.due = due.len();

        if due.is_empty() {
            debug!(kind = %kind, run_id = %run_id, due = 0, "no sources due");
            self.stats.record_tick(kind);
            return Ok(report);
        }

        info!(kind = %kind, run_id = %run_id, due = due.len(), "processing due sources");

        let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel));
        let mut units = JoinSet::new();

        for source in due {
            let this = self.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let run_id = run_id.clone();

            units.spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return UnitOutcome::Cancelled,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return UnitOutcome::Cancelled,
                    },
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!(
                            kind = %this.kind(),
                            run_id = %run_id,
                            source = %source.name,
                            "source processing cancelled"
                        );
                        UnitOutcome::Cancelled
                    }
                    outcome = this.process_source(&source, &run_id) => outcome,
                }
            });
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(outcome) => tally(&mut report, outcome),
                Err(e) => {
                    error!(kind = %kind, run_id = %run_id, error = %e, "source unit aborted");
                    report.failed += 1;
                }
            }
        }

        self.stats.record_tick(kind);

        let summary_is_quiet = report.items_added == 0 && report.failed == 0;
        if summary_is_quiet {
            debug!(
                kind = %kind,
                run_id = %run_id,
                due = report.due,
                not_modified = report.not_modified,
                throttled = report.throttled,
                cancelled = report.cancelled,
                "tick finished"
            );
        } else {
            info!(
                kind = %kind,
                run_id = %run_id,
                due = report.due,
                added = report.items_added,
                failed = report.failed,
                throttled = report.throttled,
                cancelled = report.cancelled,
                "tick finished"
            );
        }

        Ok(report)
    }

    /// Fetch, parse, dedupe and reschedule one source.
    async fn process_source(&self, source: &Source, run_id: &str) -> UnitOutcome {
        let kind = self.kind();
        let now = Utc::now();
        let policy = self.strategy.policy();

        let result = AssertUnwindSafe(self.fetch_and_store(source, now))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(crate::IngestError::Internal(format!(
                    "panic while processing source: {}",
                    panic_message(panic.as_ref())
                )))
            });

        let (update, outcome) = match result {
            Ok(Processed::Fresh { added, validators }) => {
                if added > 0 {
                    info!(kind = %kind, run_id = %run_id, source = %source.name, added, "source ingested");
                } else {
                    debug!(kind = %kind, run_id = %run_id, source = %source.name, "source had no new items");
                }
                self.stats.record_success(kind, added);
                (
                    policy.on_success(source, now, validators.etag, validators.last_modified),
                    UnitOutcome::Fresh { added },
                )
            }
            Ok(Processed::NotModified) => {
                debug!(kind = %kind, run_id = %run_id, source = %source.name, "source not modified");
                self.stats.record_not_modified(kind);
                (policy.on_not_modified(source, now), UnitOutcome::NotModified)
            }
            Ok(Processed::Throttled { reason }) => {
                warn!(kind = %kind, run_id = %run_id, source = %source.name, reason = %reason, "source throttled");
                self.stats.record_throttled(kind);
                (policy.on_throttled(source, now, &reason), UnitOutcome::Throttled)
            }
            Err(e) => {
                warn!(
                    kind = %kind,
                    run_id = %run_id,
                    source = %source.name,
                    error_count = source.error_count + 1,
                    error = %e,
                    "source fetch failed"
                );
                self.stats.record_failure(kind);
                (
                    policy.on_hard_failure(source, now, &e.to_string()),
                    UnitOutcome::Failed,
                )
            }
        };

        self.persist_schedule(source, &update, run_id).await;
        outcome
    }

    async fn fetch_and_store(&self, source: &Source, now: DateTime<Utc>) -> Result<Processed> {
        match self.strategy.fetch_and_parse(source, now).await? {
            FetchResult::Fresh { items, validators } => {
                let added = DedupeEngine::new(self.db.pool())
                    .ingest(source.id, &items, now)
                    .await?;
                Ok(Processed::Fresh { added, validators })
            }
            FetchResult::NotModified => Ok(Processed::NotModified),
            FetchResult::Throttled { reason } => Ok(Processed::Throttled { reason }),
        }
    }

    async fn persist_schedule(&self, source: &Source, update: &ScheduleUpdate, run_id: &str) {
        let kind = self.kind();
        match SourceRepository::new(self.db.pool())
            .apply_schedule(source, update)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                kind = %kind,
                run_id = %run_id,
                source = %source.name,
                "schedule changed concurrently, outcome not recorded"
            ),
            Err(e) => error!(
                kind = %kind,
                run_id = %run_id,
                source = %source.name,
                error = %e,
                "failed to record source schedule"
            ),
        }
    }
}

fn tally(report: &mut TickReport, outcome: UnitOutcome) {
    match outcome {
        UnitOutcome::Fresh { added } => {
            report.succeeded += 1;
            report.items_added += added;
        }
        UnitOutcome::NotModified => report.not_modified += 1,
        UnitOutcome::Throttled => report.throttled += 1,
        UnitOutcome::Failed => report.failed += 1,
        UnitOutcome::Cancelled => report.cancelled += 1,
    }
}

fn new_run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(RUN_ID_LENGTH);
    id
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
