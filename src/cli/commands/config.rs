//! Config command implementations.

use colored::Colorize;
use std::path::Path;

use super::{config_file, effective_config};
use crate::cli::ConfigCommands;
use crate::config::{load_config, save_config};
use crate::error::Result;

/// Execute config commands.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written, or the
/// value given to `set` is invalid.
pub fn execute(command: &ConfigCommands, config_path: Option<&Path>, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(config_path, json),
        ConfigCommands::Set { key, value } => set(key, value, config_path, json),
        ConfigCommands::Path => path(config_path, json),
    }
}

fn show(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = effective_config(config_path)?.redacted();

    if json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

fn set(key: &str, value: &str, config_path: Option<&Path>, json: bool) -> Result<()> {
    let path = config_file(config_path)?;

    // Environment overrides are not persisted.
    let mut config = load_config(&path)?;
    config.set(key, value)?;
    save_config(&path, &config)?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "key": key,
            "path": path.display().to_string(),
        });
        println!("{output}");
    } else {
        println!("{} {key} in {}", "Updated".green(), path.display());
    }
    Ok(())
}

fn path(config_path: Option<&Path>, json: bool) -> Result<()> {
    let path = config_file(config_path)?;

    if json {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{output}");
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
