//! CLI definitions using clap.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::error::Result;
use crate::sync::{SyncScope, parse_date_from_file};

pub mod commands;

/// memosync - Sync Memos into daily Markdown notes
#[derive(Parser, Debug)]
#[command(name = "memosync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ~/.memosync/config.json)
    #[arg(long, global = true, env = "MEMOSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// State database path (default: ~/.memosync/state.db)
    #[arg(long, global = true, env = "MEMOSYNC_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync memos into the journal
    Sync(SyncArgs),

    /// Show the cursor and recent sync runs
    Status {
        /// Number of recent runs to show
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: u32,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct SyncArgs {
    /// Clear the cursor and resync everything
    #[arg(long)]
    pub force: bool,

    /// Only memos created today
    #[arg(long)]
    pub today: bool,

    /// Only memos from the current week (Monday to Sunday)
    #[arg(long)]
    pub week: bool,

    /// Only memos from the current month
    #[arg(long)]
    pub month: bool,

    /// Only memos from one day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    pub date: Option<NaiveDate>,

    /// Only memos for the day a journal file is named after (YYYY-MM-DD.md)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl SyncArgs {
    /// The scope these flags select.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if `--file` does not name a day.
    pub fn scope(&self) -> Result<SyncScope> {
        if let Some(path) = &self.file {
            return Ok(SyncScope::Date(parse_date_from_file(path)?));
        }

        Ok(match self.date {
            Some(day) => SyncScope::Date(day),
            None if self.force => SyncScope::Full,
            None if self.today => SyncScope::Today,
            None if self.week => SyncScope::Week,
            None if self.month => SyncScope::Month,
            None => SyncScope::Incremental,
        })
    }
}

fn parse_day(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (token redacted)
    Show,

    /// Set one configuration value
    Set {
        /// Setting name, e.g. `endpoint` or `time_format`
        key: String,
        /// New value
        value: String,
    },

    /// Print the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_flags_select_scope() {
        let cli = Cli::try_parse_from(["memosync", "sync", "--week"]).unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.scope().unwrap(), SyncScope::Week);

        let cli = Cli::try_parse_from(["memosync", "sync", "--date", "2024-03-01"]).unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(
            args.scope().unwrap(),
            SyncScope::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );

        assert_eq!(SyncArgs::default().scope().unwrap(), SyncScope::Incremental);
    }

    #[test]
    fn test_sync_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["memosync", "sync", "--force", "--today"]).is_err());
        assert!(Cli::try_parse_from(["memosync", "sync", "--date", "03/01/2024"]).is_err());
    }

    #[test]
    fn test_sync_file_flag_reads_day_from_name() {
        let args = SyncArgs {
            file: Some(PathBuf::from("Daily/2024-02-29.md")),
            ..SyncArgs::default()
        };
        assert_eq!(
            args.scope().unwrap(),
            SyncScope::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }
}
