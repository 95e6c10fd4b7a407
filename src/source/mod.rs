//! Source registry for Feedloom.
//!
//! Sources carry their own scheduling state (`next_fetch_at`, error count,
//! cache validators). The ingest pollers read due sources from here and
//! write each processing outcome back with a single conditional update.

mod repository;
mod types;

pub use repository::SourceRepository;
pub use types::{NewSource, ScheduleUpdate, Source, SourceKind, MAX_ERROR_LENGTH};
