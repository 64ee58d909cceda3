//! Status command implementation.

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{db_file, effective_config};
use crate::error::Result;
use crate::storage::{ResumePoint, SqliteStorage, SyncRunRecord, cursor_key};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    endpoint: String,
    cursor_key: Option<String>,
    /// Unix milliseconds
    cursor: Option<i64>,
    resume: Option<ResumePoint>,
    runs: Vec<SyncRunRecord>,
}

/// Execute status command.
///
/// Works without a complete configuration; a missing token only means there
/// is no cursor to show.
///
/// # Errors
///
/// Returns an error if the config file or the state database cannot be read.
pub fn execute(
    config_path: Option<&Path>,
    db_path: Option<&Path>,
    limit: u32,
    json: bool,
) -> Result<()> {
    let config = effective_config(config_path)?;
    let db_path = db_file(db_path)?;

    let key = (!config.access_token.trim().is_empty())
        .then(|| cursor_key(config.access_token.trim()));

    let (cursor, resume, runs) = match &key {
        Some(key) if db_path.exists() => {
            let storage = SqliteStorage::open(&db_path)?;
            (
                storage.get_cursor(key)?,
                storage.get_resume(key)?,
                storage.recent_runs(key, limit)?,
            )
        }
        _ => (None, None, Vec::new()),
    };

    let output = StatusOutput {
        endpoint: config.endpoint,
        cursor_key: key,
        cursor,
        resume,
        runs,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    print_status(&output);
    Ok(())
}

fn local_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn print_status(output: &StatusOutput) {
    println!("{}", "Sync Status".bold().underline());
    println!();

    if output.endpoint.is_empty() {
        println!("  Endpoint: {}", "not configured".yellow());
    } else {
        println!("  Endpoint: {}", output.endpoint);
    }

    match (&output.cursor_key, output.cursor) {
        (None, _) => println!("  Cursor:   {}", "no access token configured".yellow()),
        (Some(_), None) => println!(
            "  Cursor:   {}",
            "none (next sync fetches everything)".dimmed()
        ),
        (Some(_), Some(ms)) => println!("  Cursor:   {}", local_time(ms)),
    }
    if let Some(resume) = output.resume {
        println!(
            "  Resume:   from memo {} (chain started {})",
            resume.next_offset,
            local_time(resume.chain_started_at)
        );
    }

    println!();
    if output.runs.is_empty() {
        println!("{}", "No sync runs recorded.".dimmed());
        return;
    }

    println!("{}", "Recent Runs:".blue().bold());
    for run in &output.runs {
        let outcome = match run.outcome.as_str() {
            "completed" => run.outcome.green(),
            "nothing_to_sync" => run.outcome.dimmed(),
            _ => run.outcome.red(),
        };
        println!(
            "  {}  {:<12} {}  {} memo(s), {} day(s), {} skipped",
            local_time(run.started_at),
            run.scope,
            outcome,
            run.records_included,
            run.days_written,
            run.days_skipped
        );
        if let Some(error) = &run.error {
            println!("    {}", error.dimmed());
        }
    }
}
