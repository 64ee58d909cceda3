//! Error types for memosync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 4=validation, 5=journal, 6=fetch, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for memosync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Validation (exit 4)
    InvalidArgument,
    InvalidDate,

    // Journal (exit 5)
    HeadingNotFound,
    TemplateMissing,
    FileCreationFailed,

    // Fetch (exit 6)
    FetchFailed,
    MalformedResponse,

    // Config (exit 7)
    ConfigMissing,
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidDate => "INVALID_DATE",
            Self::HeadingNotFound => "HEADING_NOT_FOUND",
            Self::TemplateMissing => "TEMPLATE_MISSING",
            Self::FileCreationFailed => "FILE_CREATION_FAILED",
            Self::FetchFailed => "FETCH_FAILED",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::ConfigMissing => "CONFIG_MISSING",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::InvalidArgument | Self::InvalidDate => 4,
            Self::HeadingNotFound | Self::TemplateMissing | Self::FileCreationFailed => 5,
            Self::FetchFailed | Self::MalformedResponse => 6,
            Self::ConfigMissing | Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether running the same command again may succeed.
    ///
    /// True for network failures; the cursor is left untouched on a failed
    /// fetch so the next pass retries the same range.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::MalformedResponse | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in memosync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing configuration: {field}")]
    ConfigMissing { field: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetching memos failed after {attempts} attempt(s): {message}")]
    Fetch { attempts: u32, message: String },

    #[error("Malformed response from Memos API: {0}")]
    MalformedResponse(String),

    #[error("Heading not found: {heading}")]
    HeadingNotFound { heading: String },

    #[error("Template file does not exist: {}", path.display())]
    TemplateMissing { path: PathBuf },

    #[error("Could not create journal file {}: {message}", path.display())]
    FileCreation { path: PathBuf, message: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConfigMissing { .. } => ErrorCode::ConfigMissing,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Fetch { .. } | Self::Http(_) => ErrorCode::FetchFailed,
            Self::MalformedResponse(_) => ErrorCode::MalformedResponse,
            Self::HeadingNotFound { .. } => ErrorCode::HeadingNotFound,
            Self::TemplateMissing { .. } => ErrorCode::TemplateMissing,
            Self::FileCreation { .. } => ErrorCode::FileCreationFailed,
            Self::InvalidDate(_) => ErrorCode::InvalidDate,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ConfigMissing { field } => Some(format!(
                "Set it with `memosync config set {field} <value>`."
            )),
            Self::Fetch { .. } | Self::Http(_) => Some(
                "Check the endpoint and token. The sync cursor was not advanced, \
                 so the next run retries the same range."
                    .to_string(),
            ),
            Self::HeadingNotFound { heading } => Some(format!(
                "Add a `# {heading}` heading to the journal template, or change \
                 `heading_title`."
            )),
            Self::TemplateMissing { path } => Some(format!(
                "Create {} or point `template_path` at an existing file.",
                path.display()
            )),
            Self::InvalidDate(_) => Some("Dates use the YYYY-MM-DD format.".to_string()),
            Self::Config(_)
            | Self::MalformedResponse(_)
            | Self::FileCreation { .. }
            | Self::InvalidArgument(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::ConfigMissing { field: "endpoint" }.exit_code(), 7);
        assert_eq!(
            Error::Fetch {
                attempts: 3,
                message: "timeout".into()
            }
            .exit_code(),
            6
        );
        assert_eq!(
            Error::HeadingNotFound {
                heading: "Journal".into()
            }
            .exit_code(),
            5
        );
        assert_eq!(Error::InvalidDate("x".into()).exit_code(), 4);
        assert_eq!(Error::Other("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::ConfigMissing { field: "access_token" };
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "CONFIG_MISSING");
        assert_eq!(json["error"]["retryable"], false);
        assert!(
            json["error"]["hint"]
                .as_str()
                .unwrap()
                .contains("config set access_token")
        );
    }

    #[test]
    fn test_fetch_errors_are_retryable() {
        let err = Error::MalformedResponse("unauthorized".into());
        assert!(err.error_code().is_retryable());
        assert!(!ErrorCode::HeadingNotFound.is_retryable());
    }
}
