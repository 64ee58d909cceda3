//! Time prefix format for journal entries.
//!
//! Entries are rendered as `- HH:mm ...` or `- HH:mm:ss ...`. The same
//! pattern is used to parse times back out of an existing journal section,
//! so the sort key always has the precision that is visible in the text.

use serde::{Deserialize, Serialize};

/// Time prefix values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "HH:mm")]
    HourMinute,
    #[serde(rename = "HH:mm:ss")]
    HourMinuteSecond,
}

impl TimeFormat {
    /// Get the display pattern as written in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HourMinute => "HH:mm",
            Self::HourMinuteSecond => "HH:mm:ss",
        }
    }

    /// The equivalent `chrono` strftime pattern.
    #[must_use]
    pub const fn strftime(&self) -> &'static str {
        match self {
            Self::HourMinute => "%H:%M",
            Self::HourMinuteSecond => "%H:%M:%S",
        }
    }

    /// Parse from the configuration string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "HH:mm" => Some(Self::HourMinute),
            "HH:mm:ss" => Some(Self::HourMinuteSecond),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_display_pattern() {
        let json = serde_json::to_string(&TimeFormat::HourMinuteSecond).unwrap();
        assert_eq!(json, "\"HH:mm:ss\"");

        let parsed: TimeFormat = serde_json::from_str("\"HH:mm\"").unwrap();
        assert_eq!(parsed, TimeFormat::HourMinute);
    }

    #[test]
    fn test_parse_rejects_unknown_patterns() {
        assert_eq!(TimeFormat::parse(" HH:mm:ss "), Some(TimeFormat::HourMinuteSecond));
        assert_eq!(TimeFormat::parse("hh:mm"), None);
    }
}
