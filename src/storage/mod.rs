//! SQLite storage layer for memosync.
//!
//! Persists the small amount of state that must survive between runs:
//! - The sync cursor (last-sync watermark), keyed per access token
//! - Where a pass cut short by the page ceiling should resume
//! - A history of sync passes for `memosync status`
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod schema;
pub mod sqlite;

pub use sqlite::{ResumePoint, SqliteStorage, SyncRunRecord, cursor_key};
