//! Data models for memosync.
//!
//! This module contains the domain models shared by the sync engine:
//! - RemoteRecord (one memo as returned by the Memos API)
//! - Resource (an attachment on a memo)
//! - TimeFormat (the time prefix rendered in journal entries)

pub mod record;
pub mod time_format;

pub use record::{RemoteRecord, Resource};
pub use time_format::TimeFormat;
