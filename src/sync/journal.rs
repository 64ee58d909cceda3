//! Daily note resolution.
//!
//! A day maps to `{journal_folder}/{YYYY-MM-DD}.md` under the vault. Missing
//! notes are created from the configured template.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{Error, Result};

/// Find the note for `day`, creating it from the template if absent.
///
/// # Errors
///
/// Returns `TemplateMissing` when no template is configured or the template
/// file does not exist, and `FileCreation` when the note cannot be written.
pub fn resolve(config: &SyncConfig, day: NaiveDate) -> Result<PathBuf> {
    let path = config.journal_path(day);
    if path.is_file() {
        debug!(path = %path.display(), "Using existing journal note");
        return Ok(path);
    }

    let template = config.template_file();
    if config.template_path.trim().is_empty() || !template.is_file() {
        return Err(Error::TemplateMissing { path: template });
    }

    let content = fs::read_to_string(&template).map_err(|e| Error::FileCreation {
        path: path.clone(),
        message: format!("cannot read template {}: {e}", template.display()),
    })?;

    create_note(&path, &content)?;
    info!(path = %path.display(), "Created journal note from template");
    Ok(path)
}

fn create_note(path: &Path, content: &str) -> Result<()> {
    let creation_error = |e: std::io::Error| Error::FileCreation {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(creation_error)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => file.write_all(content.as_bytes()).map_err(creation_error),
        // Created between the existence check and here; keep what is there.
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(creation_error(e)),
    }
}
