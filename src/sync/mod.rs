//! Memos to journal synchronization.
//!
//! The engine is split into small stages:
//!
//! - **Client**: pages through `GET /api/v1/memo` with retry and backoff
//! - **Format**: renders one record as a `- HH:mm ...` block with its day and sort key
//! - **Section**: finds the heading section of a daily note and splits its blocks
//! - **Merge**: combines remote entries with local blocks and rebuilds the note
//! - **Journal**: locates the daily note, creating it from the template
//! - **Orchestrator**: drives a pass and owns the cursor and in-flight guard
//!
//! # Example
//!
//! ```ignore
//! use memosync::sync::{MemosClient, SyncScope, Syncer};
//!
//! let client = MemosClient::new(&config)?;
//! let syncer = Syncer::new(config, client, storage);
//! let report = syncer.sync(SyncScope::Incremental).await?;
//! ```

mod client;
mod file;
mod format;
mod journal;
mod merge;
mod orchestrator;
mod section;

pub use client::{MemosClient, RecordSource, RetryPolicy, USER_AGENT};
pub use file::{atomic_write, read_document};
pub use format::{FormattedEntry, format_record, render_block, sort_key_for};
pub use journal::resolve as resolve_journal;
pub use merge::{DayBucket, merge, render_document};
pub use orchestrator::{
    DaySkip, InclusionWindow, SyncOutcome, SyncReport, SyncScope, SyncStatus, Syncer,
    parse_date_from_file,
};
pub use section::{DocumentSection, LocalEntries, heading_prefix, locate, parse_entries, split_blocks};
