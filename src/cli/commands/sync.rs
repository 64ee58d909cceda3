//! Sync command implementation.
//!
//! Runs one pass against the configured Memos endpoint and prints the
//! report. A pass that stopped on a fetch failure exits with the fetch
//! error code after the report is printed.

use colored::Colorize;
use std::path::Path;

use super::{db_file, effective_config};
use crate::cli::SyncArgs;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use crate::sync::{MemosClient, SyncOutcome, SyncReport, Syncer};

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete, the state database
/// cannot be opened, or the pass stopped on a fetch failure.
pub fn execute(
    args: &SyncArgs,
    config_path: Option<&Path>,
    db_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let scope = args.scope()?;
    let config = effective_config(config_path)?;
    config.validate()?;

    let storage = SqliteStorage::open(&db_file(db_path)?)?;
    let client = MemosClient::new(&config)?;
    let attempts = config.max_attempts;
    let syncer = Syncer::new(config, client, storage);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    let report = rt.block_on(syncer.sync(scope))?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_report(&report);
    }

    match (report.outcome, report.error) {
        (SyncOutcome::FetchFailed, Some(message)) => Err(Error::Fetch { attempts, message }),
        _ => Ok(()),
    }
}

fn print_report(report: &SyncReport) {
    match report.outcome {
        SyncOutcome::Completed => println!(
            "{} {} memo(s) into {} day(s) ({})",
            "Synced".green().bold(),
            report.records_included,
            report.days_written,
            report.scope
        ),
        SyncOutcome::NothingToSync => println!("{}", "Nothing new to sync.".dimmed()),
        SyncOutcome::AlreadyRunning => println!("{}", "A sync is already running.".yellow()),
        SyncOutcome::FetchFailed => println!(
            "{} after {} page(s); {} memo(s) merged before the failure.",
            "Fetch failed".red().bold(),
            report.pages,
            report.records_included
        ),
        SyncOutcome::PageLimitReached => match report.resume_offset {
            Some(offset) => println!(
                "{} after {} page(s); run sync again to continue from memo {offset}.",
                "Page limit reached".yellow().bold(),
                report.pages
            ),
            None => println!(
                "{} after {} page(s); raise max_pages to cover the whole range.",
                "Page limit reached".yellow().bold(),
                report.pages
            ),
        },
    }

    for skip in &report.days_skipped {
        println!("  {} {}: {}", "skipped".yellow(), skip.day, skip.reason);
    }

    if report.cursor_advanced {
        println!("{}", "Cursor advanced.".dimmed());
    }
}
