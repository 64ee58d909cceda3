//! Configuration management.
//!
//! This module provides functions for locating the memosync home directory,
//! resolving the config file and state database paths, and loading the
//! [`SyncConfig`] snapshot the sync engine runs against.
//!
//! # Layout
//!
//! - **Config**: `~/.memosync/config.json` (override: `--config` / `MEMOSYNC_CONFIG`)
//! - **State**: `~/.memosync/state.db` holding the sync cursor and run history
//!   (override: `--db` / `MEMOSYNC_DB`)

mod settings;

pub use settings::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TOLERANCE_MS, SETTABLE_KEYS, SyncConfig, load_config, save_config,
};

use std::path::{Path, PathBuf};

/// Get the global memosync directory location (`~/.memosync/`).
#[must_use]
pub fn global_memosync_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".memosync"))
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `explicit_path` (from `--config`, which also reads `MEMOSYNC_CONFIG`)
/// 2. `~/.memosync/config.json`
#[must_use]
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    global_memosync_dir().map(|dir| dir.join("config.json"))
}

/// Resolve the state database path.
///
/// Priority:
/// 1. `explicit_path` (from `--db`, which also reads `MEMOSYNC_DB`)
/// 2. `~/.memosync/state.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    global_memosync_dir().map(|dir| dir.join("state.db"))
}

/// Resolve a vault-relative path. Absolute paths are returned unchanged.
#[must_use]
pub fn resolve_in_vault(vault_root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        vault_root.join(candidate)
    }
}
