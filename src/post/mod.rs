//! Internal content store.
//!
//! Verified posts are read by the internal ingest poller and turned into
//! feed items without any network fetch.

mod repository;
mod types;

pub use repository::PostRepository;
pub use types::{NewPost, Post};
