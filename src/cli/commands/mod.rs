//! Command implementations.

pub mod completions;
pub mod config;
pub mod status;
pub mod sync;
pub mod version;

use std::path::{Path, PathBuf};

use crate::config::{SyncConfig, load_config, resolve_config_path, resolve_db_path};
use crate::error::{Error, Result};

/// Config file path, or an error when no home directory is available.
fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_config_path(explicit)
        .ok_or_else(|| Error::Config("Cannot determine home directory; pass --config".into()))
}

fn db_file(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_db_path(explicit)
        .ok_or_else(|| Error::Config("Cannot determine home directory; pass --db".into()))
}

/// Load the config file with environment overrides applied.
fn effective_config(explicit: Option<&Path>) -> Result<SyncConfig> {
    let path = config_file(explicit)?;
    Ok(load_config(&path)?.with_env_overrides())
}
