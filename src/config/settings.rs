//! Sync configuration snapshot.
//!
//! Loads and saves settings from `~/.memosync/config.json`. A loaded
//! [`SyncConfig`] is an immutable value: the orchestrator receives a copy at
//! construction and only sees new settings through an explicit reconfigure.

use crate::error::{Error, Result};
use crate::model::TimeFormat;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::resolve_in_vault;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TOLERANCE_MS: i64 = 1000;

/// Keys accepted by `memosync config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "endpoint",
    "access_token",
    "heading_title",
    "vault_root",
    "journal_folder",
    "template_path",
    "time_format",
    "page_size",
    "max_pages",
    "request_timeout_secs",
    "max_attempts",
    "tolerance_ms",
];

/// Settings for one sync target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Memos list endpoint, e.g. `https://memos.example.com/api/v1/memo`
    pub endpoint: String,

    /// Bearer token for the endpoint
    pub access_token: String,

    /// Heading the synced entries live under (`Journal` or `## Journal`)
    pub heading_title: String,

    /// Root directory of the Markdown vault
    pub vault_root: PathBuf,

    /// Folder for daily notes, relative to `vault_root` unless absolute
    pub journal_folder: String,

    /// Template copied into new daily notes, relative to `vault_root` unless absolute
    pub template_path: String,

    /// Time prefix rendered before each entry
    pub time_format: TimeFormat,

    /// Records requested per page
    pub page_size: u32,

    /// Upper bound on pages fetched in one pass
    pub max_pages: u32,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Attempts per page before the pass gives up
    pub max_attempts: u32,

    /// Slack below the cursor that still counts as new (milliseconds)
    pub tolerance_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: String::new(),
            heading_title: String::new(),
            vault_root: PathBuf::from("."),
            journal_folder: String::new(),
            template_path: String::new(),
            time_format: TimeFormat::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
        }
    }
}

impl SyncConfig {
    /// Check that the fields a pass cannot run without are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` naming the first empty required field.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::ConfigMissing { field: "endpoint" });
        }
        if self.access_token.trim().is_empty() {
            return Err(Error::ConfigMissing {
                field: "access_token",
            });
        }
        if self.heading_title.trim().is_empty() {
            return Err(Error::ConfigMissing {
                field: "heading_title",
            });
        }
        Ok(())
    }

    /// Directory that holds the daily notes.
    #[must_use]
    pub fn journal_dir(&self) -> PathBuf {
        resolve_in_vault(&self.vault_root, &self.journal_folder)
    }

    /// Template file for new daily notes.
    #[must_use]
    pub fn template_file(&self) -> PathBuf {
        resolve_in_vault(&self.vault_root, &self.template_path)
    }

    /// Daily note path for a day: `{journal_folder}/{YYYY-MM-DD}.md`.
    #[must_use]
    pub fn journal_path(&self, day: NaiveDate) -> PathBuf {
        self.journal_dir()
            .join(format!("{}.md", day.format("%Y-%m-%d")))
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply `MEMOS_ENDPOINT`, `MEMOS_TOKEN`, `MEMOSYNC_HEADING` and
    /// `MEMOSYNC_VAULT` on top of the file settings.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(endpoint) = var("MEMOS_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(token) = var("MEMOS_TOKEN") {
            self.access_token = token;
        }
        if let Some(heading) = var("MEMOSYNC_HEADING") {
            self.heading_title = heading;
        }
        if let Some(vault) = var("MEMOSYNC_VAULT") {
            self.vault_root = PathBuf::from(vault);
        }
        self
    }

    /// Copy of the config that is safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.access_token.is_empty() {
            let tail: String = copy
                .access_token
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            copy.access_token = format!("****{tail}");
        }
        copy
    }

    /// Update one field from its string form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unknown keys or unparseable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("{key} expects a number, got '{value}'")))
        }

        match key {
            "endpoint" => self.endpoint = value.trim().to_string(),
            "access_token" => self.access_token = value.trim().to_string(),
            "heading_title" => self.heading_title = value.trim().to_string(),
            "vault_root" => self.vault_root = PathBuf::from(value.trim()),
            "journal_folder" => self.journal_folder = value.trim().to_string(),
            "template_path" => self.template_path = value.trim().to_string(),
            "time_format" => {
                self.time_format = TimeFormat::parse(value).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "time_format must be HH:mm or HH:mm:ss, got '{value}'"
                    ))
                })?;
            }
            "page_size" => self.page_size = number(key, value)?,
            "max_pages" => self.max_pages = number(key, value)?,
            "request_timeout_secs" => self.request_timeout_secs = number(key, value)?,
            "max_attempts" => self.max_attempts = number(key, value)?,
            "tolerance_ms" => self.tolerance_ms = number(key, value)?,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown config key '{key}' (expected one of: {})",
                    SETTABLE_KEYS.join(", ")
                )));
            }
        }

        if self.page_size == 0 || self.max_pages == 0 || self.max_attempts == 0 {
            return Err(Error::InvalidArgument(format!("{key} must be at least 1")));
        }
        Ok(())
    }
}

/// Load the config file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns a `Config` error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the config file, creating its directory if needed.
///
/// # Errors
///
/// Returns a `Config` error if the file cannot be written.
pub fn save_config(path: &Path, config: &SyncConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn complete() -> SyncConfig {
        SyncConfig {
            endpoint: "https://memos.test/api/v1/memo".into(),
            access_token: "secret-token".into(),
            heading_title: "Journal".into(),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        assert!(complete().validate().is_ok());

        let mut config = complete();
        config.access_token = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigMissing { field: "access_token" })
        ));

        let mut config = complete();
        config.heading_title.clear();
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigMissing { field: "heading_title" })
        ));
    }

    #[test]
    fn test_journal_path_layout() {
        let config = SyncConfig {
            vault_root: PathBuf::from("/vault"),
            journal_folder: "Daily".into(),
            ..complete()
        };
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(config.journal_path(day), PathBuf::from("/vault/Daily/2024-03-01.md"));
    }

    #[test]
    fn test_set_parses_values() {
        let mut config = SyncConfig::default();
        config.set("time_format", "HH:mm:ss").unwrap();
        config.set("page_size", "20").unwrap();
        assert_eq!(config.time_format, TimeFormat::HourMinuteSecond);
        assert_eq!(config.page_size, 20);

        assert!(config.set("page_size", "many").is_err());
        assert!(config.set("page_size", "0").is_err());
        assert!(config.set("colour", "blue").is_err());
    }

    #[test]
    fn test_redacted_hides_token() {
        let redacted = complete().redacted();
        assert_eq!(redacted.access_token, "****oken");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        save_config(&path, &complete()).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, complete());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = load_config(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(loaded.time_format, TimeFormat::HourMinute);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"endpoint":"https://x","time_format":"HH:mm:ss"}"#).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.endpoint, "https://x");
        assert_eq!(loaded.time_format, TimeFormat::HourMinuteSecond);
        assert_eq!(loaded.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }
}
