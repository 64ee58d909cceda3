//! SQLite storage implementation.
//!
//! The cursor is stored as a decimal string of Unix milliseconds. Every
//! timestamp crossing this boundary is in milliseconds.

use crate::error::Result;
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// One row of sync history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunRecord {
    pub id: String,
    pub cursor_key: String,
    pub scope: String,
    pub outcome: String,
    pub pages: u32,
    pub records_included: u32,
    pub days_written: u32,
    pub days_skipped: u32,
    pub cursor_advanced: bool,
    pub error: Option<String>,
    /// Unix milliseconds
    pub started_at: i64,
    /// Unix milliseconds
    pub finished_at: i64,
}

/// Where a pass that hit the page ceiling stopped.
///
/// The next cursor-owning pass starts fetching at `next_offset` instead of
/// `0`. When that chain of passes finally ends normally, the cursor moves to
/// `chain_started_at`, so memos created while the chain was running are
/// still picked up afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub next_offset: u32,
    /// Unix milliseconds
    pub chain_started_at: i64,
}

/// Storage key for the cursor belonging to an access token.
///
/// The token is hashed so switching accounts uses a separate watermark
/// without the raw token ever being written to disk.
#[must_use]
pub fn cursor_key(access_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(access_token.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("last-time-{}", &digest[..16])
}

impl SqliteStorage {
    /// Open a database at the given path, creating parent directories and
    /// applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    // ==================
    // Cursor Operations
    // ==================

    /// Read the cursor in Unix milliseconds.
    ///
    /// Returns `None` when no cursor was ever written, when it was cleared, or
    /// when the stored value is not a number (treated as "sync everything").
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_cursor(&self, key: &str) -> Result<Option<i64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_cursors WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value.and_then(|v| v.trim().parse::<i64>().ok()))
    }

    /// Write the cursor (Unix milliseconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn set_cursor(&self, key: &str, millis: i64) -> Result<()> {
        self.write_cursor_value(key, &millis.to_string())
    }

    /// Reset the cursor to empty so the next pass syncs everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn clear_cursor(&self, key: &str) -> Result<()> {
        self.write_cursor_value(key, "")
    }

    fn write_cursor_value(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO sync_cursors (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }

    // ==================
    // Resume Points
    // ==================

    /// Read the resume point left by a pass that hit the page ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_resume(&self, key: &str) -> Result<Option<ResumePoint>> {
        Ok(self
            .conn
            .query_row(
                "SELECT next_offset, chain_started_at FROM sync_resume WHERE key = ?1",
                [key],
                |row| {
                    Ok(ResumePoint {
                        next_offset: row.get(0)?,
                        chain_started_at: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// Write the resume point for a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn set_resume(&self, key: &str, resume: &ResumePoint) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO sync_resume (key, next_offset, chain_started_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET next_offset = excluded.next_offset,
                 chain_started_at = excluded.chain_started_at, updated_at = excluded.updated_at",
            rusqlite::params![key, resume.next_offset, resume.chain_started_at, now],
        )?;
        Ok(())
    }

    /// Drop the resume point so the next pass starts at offset 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_resume(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_resume WHERE key = ?1", [key])?;
        Ok(())
    }

    // ==================
    // Run History
    // ==================

    /// Append a finished pass to the history.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn record_run(&self, run: &SyncRunRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_runs (id, cursor_key, scope, outcome, pages, records_included,
                                    days_written, days_skipped, cursor_advanced, error,
                                    started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                run.id,
                run.cursor_key,
                run.scope,
                run.outcome,
                run.pages,
                run.records_included,
                run.days_written,
                run.days_skipped,
                run.cursor_advanced,
                run.error,
                run.started_at,
                run.finished_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent passes for a cursor key, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_runs(&self, key: &str, limit: u32) -> Result<Vec<SyncRunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, cursor_key, scope, outcome, pages, records_included, days_written,
                    days_skipped, cursor_advanced, error, started_at, finished_at
             FROM sync_runs WHERE cursor_key = ?1
             ORDER BY started_at DESC, rowid DESC LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![key, limit], |row| {
                Ok(SyncRunRecord {
                    id: row.get(0)?,
                    cursor_key: row.get(1)?,
                    scope: row.get(2)?,
                    outcome: row.get(3)?,
                    pages: row.get(4)?,
                    records_included: row.get(5)?,
                    days_written: row.get(6)?,
                    days_skipped: row.get(7)?,
                    cursor_advanced: row.get(8)?,
                    error: row.get(9)?,
                    started_at: row.get(10)?,
                    finished_at: row.get(11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(id: &str, started_at: i64) -> SyncRunRecord {
        SyncRunRecord {
            id: id.to_string(),
            cursor_key: "k".to_string(),
            scope: "incremental".to_string(),
            outcome: "completed".to_string(),
            pages: 2,
            records_included: 7,
            days_written: 3,
            days_skipped: 0,
            cursor_advanced: true,
            error: None,
            started_at,
            finished_at: started_at + 10,
        }
    }

    #[test]
    fn test_cursor_key_is_per_token_and_hides_token() {
        let a = cursor_key("token-a");
        let b = cursor_key("token-b");

        assert_ne!(a, b);
        assert_eq!(a, cursor_key("token-a"));
        assert!(a.starts_with("last-time-"));
        assert!(!a.contains("token-a"));
    }

    #[test]
    fn test_cursor_absent_set_and_clear() {
        let storage = SqliteStorage::open_memory().unwrap();

        assert_eq!(storage.get_cursor("k").unwrap(), None);

        storage.set_cursor("k", 1_700_000_000_000).unwrap();
        assert_eq!(storage.get_cursor("k").unwrap(), Some(1_700_000_000_000));

        storage.clear_cursor("k").unwrap();
        assert_eq!(storage.get_cursor("k").unwrap(), None);
    }

    #[test]
    fn test_cursors_are_isolated_by_key() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.set_cursor("a", 10).unwrap();
        storage.set_cursor("b", 20).unwrap();

        assert_eq!(storage.get_cursor("a").unwrap(), Some(10));
        assert_eq!(storage.get_cursor("b").unwrap(), Some(20));
    }

    #[test]
    fn test_cursor_persists_across_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("state.db");

        SqliteStorage::open(&path).unwrap().set_cursor("k", 99).unwrap();
        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.get_cursor("k").unwrap(), Some(99));
    }

    #[test]
    fn test_resume_point_set_replace_and_clear() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(storage.get_resume("k").unwrap(), None);

        let first = ResumePoint {
            next_offset: 100,
            chain_started_at: 5,
        };
        storage.set_resume("k", &first).unwrap();
        storage
            .set_resume(
                "k",
                &ResumePoint {
                    next_offset: 200,
                    ..first
                },
            )
            .unwrap();

        let stored = storage.get_resume("k").unwrap().unwrap();
        assert_eq!(stored.next_offset, 200);
        assert_eq!(stored.chain_started_at, 5);
        assert_eq!(storage.get_resume("other").unwrap(), None);

        storage.clear_resume("k").unwrap();
        assert_eq!(storage.get_resume("k").unwrap(), None);
    }

    #[test]
    fn test_recent_runs_newest_first() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.record_run(&run("r1", 100)).unwrap();
        storage.record_run(&run("r2", 300)).unwrap();
        storage.record_run(&run("r3", 200)).unwrap();

        let runs = storage.recent_runs("k", 2).unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
        assert!(runs[0].cursor_advanced);
        assert_eq!(runs[0].records_included, 7);

        assert!(storage.recent_runs("other", 10).unwrap().is_empty());
    }
}
