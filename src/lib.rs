//! memosync - Memos to Markdown journal sync
//!
//! This crate provides the core functionality for the `memosync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (`RemoteRecord`, `Resource`, `TimeFormat`)
//! - [`storage`] - SQLite cursor store and sync history
//! - [`sync`] - Fetch, format, merge and write passes
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
