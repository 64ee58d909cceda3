//! Remote record model.
//!
//! A record is one memo as returned by `GET /api/v1/memo`. Only the fields the
//! sync engine reads are modelled; unknown fields are ignored.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// An attachment on a memo.
///
/// Resources are never rendered into the journal; their presence only keeps
/// an otherwise empty memo from being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub external_link: Option<String>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A memo fetched from the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// Markdown body of the memo
    #[serde(default)]
    pub content: String,

    /// Creation time (Unix seconds)
    #[serde(default)]
    pub created_ts: i64,

    /// Creation time as RFC 3339, sent by newer servers
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update time (Unix seconds)
    #[serde(default)]
    pub updated_ts: Option<i64>,

    /// `NORMAL` for active rows
    #[serde(default)]
    pub row_status: Option<String>,

    /// Attached resources; `null` and missing both mean none
    #[serde(default)]
    pub resource_list: Option<Vec<Resource>>,
}

impl RemoteRecord {
    /// Attached resources (empty if none).
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        self.resource_list.as_deref().unwrap_or_default()
    }

    /// A record with no content and no resources carries nothing to sync.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty() && self.resources().is_empty()
    }

    /// Canonical creation time in Unix seconds.
    ///
    /// `createdAt` wins when present and parseable, otherwise `createdTs`.
    #[must_use]
    pub fn created_seconds(&self) -> i64 {
        self.created_at
            .as_deref()
            .and_then(|iso| DateTime::parse_from_rfc3339(iso).ok())
            .map_or(self.created_ts, |dt| dt.timestamp())
    }

    /// Canonical creation time in Unix milliseconds, saturating at the `i64`
    /// bounds for out-of-range server values.
    #[must_use]
    pub fn created_millis(&self) -> i64 {
        self.created_seconds().saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_memos_payload() {
        let json = r#"{
            "id": 12,
            "rowStatus": "NORMAL",
            "createdTs": 1700000000,
            "updatedTs": 1700000100,
            "content": "hello",
            "resourceList": null
        }"#;

        let record: RemoteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.content, "hello");
        assert_eq!(record.created_ts, 1_700_000_000);
        assert_eq!(record.row_status.as_deref(), Some("NORMAL"));
        assert!(record.resources().is_empty());
    }

    #[test]
    fn test_blank_record_requires_no_content_and_no_resources() {
        let mut record = RemoteRecord::default();
        assert!(record.is_blank());

        record.resource_list = Some(vec![Resource {
            filename: Some("photo.png".into()),
            ..Resource::default()
        }]);
        assert!(!record.is_blank());

        let text_only = RemoteRecord {
            content: "note".into(),
            ..RemoteRecord::default()
        };
        assert!(!text_only.is_blank());
    }

    #[test]
    fn test_created_at_takes_precedence() {
        let record = RemoteRecord {
            created_ts: 1,
            created_at: Some("2024-03-01T10:30:00Z".into()),
            ..RemoteRecord::default()
        };
        assert_eq!(record.created_seconds(), 1_709_289_000);
    }

    #[test]
    fn test_unparseable_created_at_falls_back() {
        let record = RemoteRecord {
            created_ts: 42,
            created_at: Some("yesterday".into()),
            ..RemoteRecord::default()
        };
        assert_eq!(record.created_seconds(), 42);
    }

    #[test]
    fn test_created_millis_saturates() {
        let record = RemoteRecord {
            created_ts: 1_700_000_000,
            ..RemoteRecord::default()
        };
        assert_eq!(record.created_millis(), 1_700_000_000_000);

        let far_future = RemoteRecord {
            created_ts: i64::MAX / 100,
            ..RemoteRecord::default()
        };
        assert_eq!(far_future.created_millis(), i64::MAX);

        let far_past = RemoteRecord {
            created_ts: i64::MIN / 100,
            ..RemoteRecord::default()
        };
        assert_eq!(far_past.created_millis(), i64::MIN);
    }
}
