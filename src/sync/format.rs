//! Record formatting.
//!
//! Turns a [`RemoteRecord`] into the block that is written under the journal
//! heading, together with the day it belongs to and its sort key.
//!
//! The sort key is not the raw creation time. The instant is first rendered
//! with the configured time pattern and then parsed back, so a memo created at
//! `10:30:42` sorts as `10:30:00` under `HH:mm`. This is the same key that
//! [`sort_key_for`] derives from an existing `- 10:30 ...` line, which is what
//! lets a re-synced memo replace its earlier copy.

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use tracing::warn;

use crate::model::{RemoteRecord, TimeFormat};

/// One record, ready to be merged into its day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEntry {
    /// Local calendar day of the record
    pub day: NaiveDate,
    /// Unix seconds at the precision of `TimeFormat`
    pub sort_key: i64,
    /// `- HH:mm ...` block
    pub text: String,
}

impl FormattedEntry {
    /// The `YYYY-MM-DD` day key.
    #[must_use]
    pub fn day_key(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

/// Format a record under the given time pattern, in local time.
///
/// Callers filter blank records first (see [`RemoteRecord::is_blank`]).
#[must_use]
pub fn format_record(record: &RemoteRecord, time_format: TimeFormat) -> FormattedEntry {
    let created = DateTime::from_timestamp(record.created_seconds(), 0)
        .unwrap_or_default()
        .with_timezone(&Local);

    let day = created.date_naive();
    let time = created.format(time_format.strftime()).to_string();
    let sort_key = sort_key_for(day, &time, time_format);

    FormattedEntry {
        day,
        sort_key,
        text: render_block(&time, &record.content),
    }
}

/// Render `- {time} {content}`.
///
/// Multi-line content starts on the next line with every line indented by a
/// tab, so that list items inside a memo never start a new top-level block.
#[must_use]
pub fn render_block(time: &str, content: &str) -> String {
    let content = content.trim();
    let mut block = format!("- {time} ");

    if content.contains('\n') {
        for line in content.split('\n') {
            block.push_str("\n\t");
            block.push_str(line);
        }
    } else {
        block.push_str(content);
    }

    block
}

/// Sort key for a displayed time on a given day.
///
/// Parses `time` with the configured pattern first and the other supported
/// pattern second, so `HH:mm` lines keep their order after switching to
/// `HH:mm:ss`. Returns `0` (sorts first) when the time cannot be parsed.
#[must_use]
pub fn sort_key_for(day: NaiveDate, time: &str, time_format: TimeFormat) -> i64 {
    let fallback = match time_format {
        TimeFormat::HourMinute => TimeFormat::HourMinuteSecond,
        TimeFormat::HourMinuteSecond => TimeFormat::HourMinute,
    };

    let parsed = NaiveTime::parse_from_str(time, time_format.strftime())
        .or_else(|_| NaiveTime::parse_from_str(time, fallback.strftime()));

    let Ok(parsed) = parsed else {
        warn!(%day, time, "Unparseable entry time, sorting first");
        return 0;
    };

    let naive = day.and_time(parsed);
    match naive.and_local_timezone(Local).earliest() {
        Some(local) => local.timestamp(),
        None => {
            // Inside a DST gap the wall-clock time does not exist locally.
            warn!(%day, time, "Entry time falls in a DST gap, using UTC");
            naive.and_utc().timestamp()
        }
    }
}
