//! Heading section location and parsing.
//!
//! A journal note keeps synced memos under one heading:
//!
//! ```text
//! # Journal
//! - 09:00 standup notes
//! - [x] 10:15 shipped the fix
//! - a thought without a time
//!
//! ## Tomorrow
//! ```
//!
//! The section runs from the end of the heading line to the next line that
//! starts with `##`, or to the end of the document. Its body is split into
//! blocks at every line starting with `- `; continuation lines stay with the
//! block above them.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::TimeFormat;
use crate::sync::format::sort_key_for;

/// Block that starts with an optional checkbox and a time: `- [ ] 09:30 ...`.
static TIMED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- (\[.*\] )?\d\d:\d\d").expect("timed block pattern is valid")
});

static BLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d\d:\d\d").expect("block time pattern is valid"));

static BLOCK_TIME_WITH_SECONDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d\d:\d\d(:\d\d)?").expect("block time pattern is valid")
});

/// A document split around one heading's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSection<'a> {
    /// Everything up to and including the heading line
    pub prefix: &'a str,
    /// The section body, untrimmed
    pub body: &'a str,
    /// Everything from the next `##` line on
    pub suffix: &'a str,
}

/// Blocks parsed out of a section body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalEntries {
    /// Blocks with a leading time, by sort key. Several blocks can share a
    /// key; they keep their document order.
    pub timed: BTreeMap<i64, Vec<String>>,
    /// Everything else, in document order
    pub untimed: Vec<String>,
}

/// The heading line prefix for a configured title.
///
/// `Journal` becomes `# Journal`; a title that already starts with `#` is
/// used as is.
#[must_use]
pub fn heading_prefix(title: &str) -> String {
    let title = title.trim();
    if title.starts_with('#') {
        title.to_string()
    } else {
        format!("# {title}")
    }
}

fn heading_matcher(title: &str) -> Result<Regex> {
    let pattern = format!("(?m)^#*{}", regex::escape(&heading_prefix(title)));
    Regex::new(&pattern).map_err(|e| Error::Other(format!("invalid heading pattern: {e}")))
}

/// Find the section under `heading_title`.
///
/// Extra `#` marks on the document side are accepted, so `Daily` also finds
/// `## Daily`.
///
/// # Errors
///
/// Returns `HeadingNotFound` when no line carries the heading.
pub fn locate<'a>(document: &'a str, heading_title: &str) -> Result<DocumentSection<'a>> {
    let matcher = heading_matcher(heading_title)?;
    let found = matcher.find(document).ok_or_else(|| Error::HeadingNotFound {
        heading: heading_title.trim().to_string(),
    })?;

    let body_start = document[found.start()..]
        .find('\n')
        .map_or(document.len(), |i| found.start() + i);

    let body_end = document[body_start..]
        .find("\n##")
        .map_or(document.len(), |i| body_start + i);

    Ok(DocumentSection {
        prefix: &document[..body_start],
        body: &document[body_start..body_end],
        suffix: &document[body_end..],
    })
}

/// Split a section body into `- ` blocks.
///
/// Text before the first marker forms a block of its own. Blocks are
/// returned verbatim, including blank lines before the next marker.
#[must_use]
pub fn split_blocks(body: &str) -> Vec<String> {
    let body = body.trim();
    if body.is_empty() {
        return Vec::new();
    }

    let mut blocks: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in body.split('\n') {
        match current.as_mut() {
            Some(block) if !line.starts_with("- ") => {
                block.push('\n');
                block.push_str(line);
            }
            _ => {
                if let Some(done) = current.take() {
                    blocks.push(done);
                }
                current = Some(line.to_string());
            }
        }
    }
    blocks.extend(current);

    blocks
}

/// Sort the blocks of a section body into timed and untimed entries.
///
/// The time of a timed block is read against `day`, giving the same sort
/// key a freshly formatted record at that time would get. Seconds are only
/// read under `HH:mm:ss`. Timed blocks lose trailing whitespace since they
/// are re-sorted; untimed blocks are kept verbatim.
#[must_use]
pub fn parse_entries(body: &str, day: NaiveDate, time_format: TimeFormat) -> LocalEntries {
    let mut entries = LocalEntries::default();
    let block_time = match time_format {
        TimeFormat::HourMinute => &*BLOCK_TIME,
        TimeFormat::HourMinuteSecond => &*BLOCK_TIME_WITH_SECONDS,
    };

    for block in split_blocks(body) {
        let time = TIMED_BLOCK
            .is_match(&block)
            .then(|| block_time.find(&block))
            .flatten();

        match time {
            Some(time) => {
                let key = sort_key_for(day, time.as_str(), time_format);
                entries
                    .timed
                    .entry(key)
                    .or_default()
                    .push(block.trim_end().to_string());
            }
            None => entries.untimed.push(block),
        }
    }

    entries
}
