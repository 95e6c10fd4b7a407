//! Ingestion engine for Feedloom.
//!
//! One orchestrator per source kind selects due sources on a fixed tick,
//! fetches them under a concurrency limit, parses the payload into feed
//! items, stores the unseen ones and reschedules each source with backoff.

pub mod backoff;
pub mod dedupe;
pub mod fetcher;
pub mod heartbeat;
pub mod orchestrator;
pub mod pacing;
pub mod parse;
pub mod service;
pub mod stats;
pub mod strategy;

pub use backoff::{BackoffPolicy, MIN_NEXT_FETCH_SECS};
pub use dedupe::DedupeEngine;
pub use fetcher::{FeedFetcher, FetchOutcome, FetchRequest, FetcherSettings, HttpFetcher};
pub use heartbeat::run_heartbeat;
pub use orchestrator::{Orchestrator, OrchestratorSettings, TickReport};
pub use pacing::{MinIntervalGate, RequestGate};
pub use service::IngestService;
pub use stats::{IngestStats, KindSnapshot, StatsSnapshot};
pub use strategy::{
    FetchResult, InternalStrategy, RssStrategy, SourceStrategy, SourceTarget, Validators,
    YouTubeStrategy,
};
