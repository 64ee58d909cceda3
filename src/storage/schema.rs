//! Database schema definitions.

use rusqlite::{Connection, Result};

/// Current schema version, stored in `PRAGMA user_version`.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// The complete SQL schema for the state database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds). Cursor values are
/// TEXT so that an empty string can mean "sync everything".
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS sync_cursors (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL DEFAULT '',
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_resume (
    key TEXT PRIMARY KEY,
    next_offset INTEGER NOT NULL,
    chain_started_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_runs (
    id TEXT PRIMARY KEY,
    cursor_key TEXT NOT NULL,
    scope TEXT NOT NULL,
    outcome TEXT NOT NULL,
    pages INTEGER NOT NULL DEFAULT 0,
    records_included INTEGER NOT NULL DEFAULT 0,
    days_written INTEGER NOT NULL DEFAULT 0,
    days_skipped INTEGER NOT NULL DEFAULT 0,
    cursor_advanced INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    started_at INTEGER NOT NULL,
    finished_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sync_runs_key_started ON sync_runs(cursor_key, started_at);
";

/// Apply pragmas and create tables. Idempotent.
///
/// # Errors
///
/// Returns an error if a pragma or DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("first apply");
        apply_schema(&conn).expect("second apply");

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);

        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'sync_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
