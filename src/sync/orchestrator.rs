//! Sync pass orchestration.
//!
//! A pass pages through the remote records newest first, keeps the ones its
//! [`SyncScope`] admits, groups them by local day and merges each day into
//! its journal note. Pagination stops at the first page that is wholly older
//! than the lower bound, at an empty or short page, at `max_pages`, or on a
//! fetch failure.
//!
//! Only the incremental and full scopes own the cursor. It is moved to the
//! pass start time when pagination ends normally, and left alone when the
//! pass hit a fetch failure or the page ceiling. A pass stopped by the page
//! ceiling also stores a [`ResumePoint`], and the next cursor-owning pass
//! carries on from that offset. The cursor only moves once such a chain of
//! passes reaches the end, and then to the start time of its first pass.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, PoisonError};

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate};
use regex::Regex;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::RemoteRecord;
use crate::storage::{ResumePoint, SqliteStorage, SyncRunRecord, cursor_key};
use crate::sync::client::RecordSource;
use crate::sync::file::{atomic_write, read_document};
use crate::sync::format::format_record;
use crate::sync::journal;
use crate::sync::merge::{DayBucket, merge, render_document};
use crate::sync::section::{locate, parse_entries};

static JOURNAL_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})\.md$").expect("journal file pattern is valid")
});

/// Which records a pass considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncScope {
    /// Everything newer than the cursor
    Incremental,
    /// Clear the cursor, then sync everything
    Full,
    /// Newer than the cursor and created today
    Today,
    /// The current Monday-to-Sunday week
    Week,
    /// The current calendar month
    Month,
    /// One calendar day
    Date(NaiveDate),
}

impl SyncScope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Full => "full",
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Date(_) => "date",
        }
    }

    /// Whether the pass moves the cursor when it finishes.
    #[must_use]
    pub const fn advances_cursor(&self) -> bool {
        matches!(self, Self::Incremental | Self::Full)
    }

    const fn reads_cursor(&self) -> bool {
        matches!(self, Self::Incremental | Self::Full | Self::Today)
    }
}

impl std::fmt::Display for SyncScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(day) => write!(f, "date {day}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// At least one record was merged
    Completed,
    /// Pagination ended without a record to merge
    NothingToSync,
    /// Another pass was in flight; nothing was done
    AlreadyRunning,
    /// A page could not be fetched
    FetchFailed,
    /// `max_pages` was reached before pagination ended
    PageLimitReached,
}

impl SyncOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NothingToSync => "nothing_to_sync",
            Self::AlreadyRunning => "already_running",
            Self::FetchFailed => "fetch_failed",
            Self::PageLimitReached => "page_limit_reached",
        }
    }
}

/// A day that was not written, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySkip {
    pub day: NaiveDate,
    pub reason: String,
}

/// Summary of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub scope: SyncScope,
    pub outcome: SyncOutcome,
    pub pages: u32,
    pub records_seen: u32,
    pub records_included: u32,
    pub days_written: u32,
    pub days_skipped: Vec<DaySkip>,
    pub cursor_advanced: bool,
    /// Offset this pass started fetching at
    pub start_offset: u32,
    /// Offset the next pass resumes from, when the page ceiling was hit
    pub resume_offset: Option<u32>,
    /// Set when the pass stopped on a fetch failure
    pub error: Option<String>,
}

impl SyncReport {
    fn new(run_id: String, scope: SyncScope, outcome: SyncOutcome) -> Self {
        Self {
            run_id,
            scope,
            outcome,
            pages: 0,
            records_seen: 0,
            records_included: 0,
            days_written: 0,
            days_skipped: Vec::new(),
            cursor_advanced: false,
            start_offset: 0,
            resume_offset: None,
            error: None,
        }
    }
}

/// In-memory pass state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    /// Percent of the current batch of days written
    pub progress: u8,
    pub last_error: Option<String>,
}

/// Millisecond bounds a record's creation time must fall within.
///
/// The lower bound is inclusive, the upper bound exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InclusionWindow {
    pub lower_ms: Option<i64>,
    pub upper_ms: Option<i64>,
}

impl InclusionWindow {
    /// Window for `scope` at `now`.
    ///
    /// Cursor-driven scopes start `tolerance_ms` below the cursor, so a
    /// record stamped at the watermark itself is still included.
    #[must_use]
    pub fn for_scope(
        scope: SyncScope,
        cursor_ms: Option<i64>,
        now: DateTime<Local>,
        tolerance_ms: i64,
    ) -> Self {
        let after_cursor = cursor_ms.map(|c| c.saturating_sub(tolerance_ms));
        let today = now.date_naive();

        let (start, end) = match scope {
            SyncScope::Incremental | SyncScope::Full => {
                return Self {
                    lower_ms: after_cursor,
                    upper_ms: None,
                };
            }
            SyncScope::Today => {
                let midnight = local_midnight_ms(today);
                return Self {
                    lower_ms: Some(after_cursor.map_or(midnight, |c| c.max(midnight))),
                    upper_ms: None,
                };
            }
            SyncScope::Week => {
                let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
                (monday, monday + Days::new(7))
            }
            SyncScope::Month => {
                let first = today.with_day(1).unwrap_or(today);
                (first, first + Months::new(1))
            }
            SyncScope::Date(day) => (day, day + Days::new(1)),
        };

        Self {
            lower_ms: Some(local_midnight_ms(start)),
            upper_ms: Some(local_midnight_ms(end)),
        }
    }

    #[must_use]
    pub fn admits(&self, ts_ms: i64) -> bool {
        self.lower_ms.is_none_or(|lower| ts_ms >= lower)
            && self.upper_ms.is_none_or(|upper| ts_ms < upper)
    }

    /// True when `ts_ms` is older than anything the window admits.
    #[must_use]
    pub fn is_below(&self, ts_ms: i64) -> bool {
        self.lower_ms.is_some_and(|lower| ts_ms < lower)
    }
}

fn local_midnight_ms(day: NaiveDate) -> i64 {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    midnight
        .and_local_timezone(Local)
        .earliest()
        .map_or_else(|| midnight.and_utc().timestamp_millis(), |dt| dt.timestamp_millis())
}

/// Day named by a journal file such as `Daily/2024-03-01.md`.
///
/// # Errors
///
/// Returns `InvalidDate` if the file name is not `YYYY-MM-DD.md` or is not a
/// real calendar date.
pub fn parse_date_from_file(path: &Path) -> Result<NaiveDate> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let captures = JOURNAL_FILE_NAME.captures(name).ok_or_else(|| {
        Error::InvalidDate(format!("{} is not named YYYY-MM-DD.md", path.display()))
    })?;

    NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("{}: {e}", &captures[1])))
}

enum PaginationEnd {
    Exhausted,
    PageLimit,
    FetchFailed(String),
}

/// Clears the in-flight flag when a pass ends, however it ends.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
    status: &'a Mutex<SyncStatus>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_syncing = false;
    }
}

/// Drives sync passes for one configuration snapshot.
pub struct Syncer<S> {
    config: SyncConfig,
    source: S,
    storage: Mutex<SqliteStorage>,
    syncing: AtomicBool,
    status: Mutex<SyncStatus>,
    clock: fn() -> DateTime<Local>,
}

impl<S: RecordSource> Syncer<S> {
    #[must_use]
    pub fn new(config: SyncConfig, source: S, storage: SqliteStorage) -> Self {
        Self {
            config,
            source,
            storage: Mutex::new(storage),
            syncing: AtomicBool::new(false),
            status: Mutex::new(SyncStatus::default()),
            clock: Local::now,
        }
    }

    /// Replace the clock used for "now" (pass start, today, week, month).
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Snapshot of the in-memory status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.lock_status().clone()
    }

    /// Swap in a new configuration and rebuild the record source from it.
    ///
    /// On error the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns the source's rebuild error.
    pub fn reconfigure(&mut self, config: SyncConfig) -> Result<()> {
        self.source.rebuild(&config)?;
        self.config = config;
        info!("Sync configuration replaced");
        Ok(())
    }

    /// Run one pass.
    ///
    /// A call made while another pass is in flight returns immediately with
    /// [`SyncOutcome::AlreadyRunning`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when a required setting is empty, or a
    /// database error when the cursor cannot be read or written. Fetch and
    /// per-day failures are reported in the [`SyncReport`] instead.
    pub async fn sync(&self, scope: SyncScope) -> Result<SyncReport> {
        let run_id = uuid::Uuid::new_v4().to_string();

        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!(%scope, "Sync already in progress, skipping");
            return Ok(SyncReport::new(run_id, scope, SyncOutcome::AlreadyRunning));
        }

        let _guard = PassGuard {
            flag: &self.syncing,
            status: &self.status,
        };
        {
            let mut status = self.lock_status();
            status.is_syncing = true;
            status.progress = 0;
        }

        let span = info_span!("sync_pass", run_id = %run_id, scope = %scope);
        let result = self.run_pass(scope, run_id).instrument(span).await;

        let mut status = self.lock_status();
        status.last_error = match &result {
            Ok(report) => report.error.clone(),
            Err(e) => Some(e.to_string()),
        };

        result
    }

    async fn run_pass(&self, scope: SyncScope, run_id: String) -> Result<SyncReport> {
        self.config.validate()?;

        let started = (self.clock)();
        let started_ms = started.timestamp_millis();
        let key = cursor_key(self.config.access_token.trim());

        let (cursor, resume) = {
            let storage = self.lock_storage();
            if scope == SyncScope::Full {
                storage.clear_cursor(&key)?;
                storage.clear_resume(&key)?;
                info!("Cursor cleared for full resync");
            }
            let cursor = if scope.reads_cursor() {
                storage.get_cursor(&key)?
            } else {
                None
            };
            let resume = if scope.advances_cursor() {
                storage.get_resume(&key)?
            } else {
                None
            };
            (cursor, resume)
        };

        let window = InclusionWindow::for_scope(scope, cursor, started, self.config.tolerance_ms);
        let chain_started_ms = resume.map_or(started_ms, |r| r.chain_started_at);
        let mut offset = resume.map_or(0, |r| r.next_offset);
        if resume.is_some() {
            info!(offset, "Resuming after page limit");
        }
        debug!(?cursor, ?window, offset, "Starting pass");

        let mut report = SyncReport::new(run_id, scope, SyncOutcome::Completed);
        report.start_offset = offset;
        let mut written: BTreeSet<NaiveDate> = BTreeSet::new();
        let page_size = self.config.page_size.max(1);

        let end = loop {
            if report.pages >= self.config.max_pages {
                warn!(pages = report.pages, offset, "Page limit reached, cursor kept");
                break PaginationEnd::PageLimit;
            }

            let page = match self.source.fetch_page(page_size, offset).await {
                Ok(page) => page,
                Err(e) => {
                    error!(offset, error = %e, "Stopping pass, cursor kept");
                    let message = match e {
                        Error::Fetch { message, .. } => message,
                        other => other.to_string(),
                    };
                    break PaginationEnd::FetchFailed(message);
                }
            };
            report.pages += 1;

            if page.is_empty() {
                break PaginationEnd::Exhausted;
            }
            report.records_seen += u32::try_from(page.len()).unwrap_or(u32::MAX);

            let buckets = self.bucket_page(&page, &window, &mut report);
            self.write_days(&buckets, &mut report, &mut written);

            let newest_ms = page.iter().map(RemoteRecord::created_millis).max();
            if newest_ms.is_some_and(|ts| window.is_below(ts)) {
                debug!(offset, "Page is older than the window");
                break PaginationEnd::Exhausted;
            }
            if page.len() < page_size as usize {
                break PaginationEnd::Exhausted;
            }
            offset = offset.saturating_add(page_size);
        };

        report.days_written = u32::try_from(written.len()).unwrap_or(u32::MAX);
        report.outcome = match end {
            PaginationEnd::Exhausted if report.records_included == 0 => SyncOutcome::NothingToSync,
            PaginationEnd::Exhausted => SyncOutcome::Completed,
            PaginationEnd::PageLimit => SyncOutcome::PageLimitReached,
            PaginationEnd::FetchFailed(message) => {
                report.error = Some(message);
                SyncOutcome::FetchFailed
            }
        };

        if scope.advances_cursor() {
            let storage = self.lock_storage();
            match report.outcome {
                SyncOutcome::Completed | SyncOutcome::NothingToSync => {
                    storage.set_cursor(&key, chain_started_ms)?;
                    storage.clear_resume(&key)?;
                    report.cursor_advanced = true;
                }
                SyncOutcome::PageLimitReached => {
                    storage.set_resume(
                        &key,
                        &ResumePoint {
                            next_offset: offset,
                            chain_started_at: chain_started_ms,
                        },
                    )?;
                    report.resume_offset = Some(offset);
                }
                SyncOutcome::FetchFailed | SyncOutcome::AlreadyRunning => {}
            }
        }

        info!(
            outcome = report.outcome.as_str(),
            pages = report.pages,
            included = report.records_included,
            days_written = report.days_written,
            days_skipped = report.days_skipped.len(),
            "Pass finished"
        );

        self.record_run(&key, &report, started_ms);
        Ok(report)
    }

    /// Format the admitted records of one page and group them by day.
    fn bucket_page(
        &self,
        page: &[RemoteRecord],
        window: &InclusionWindow,
        report: &mut SyncReport,
    ) -> BTreeMap<NaiveDate, DayBucket> {
        let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

        for record in page {
            if record.is_blank() || !window.admits(record.created_millis()) {
                continue;
            }
            if DateTime::from_timestamp(record.created_seconds(), 0).is_none() {
                warn!(
                    created = record.created_seconds(),
                    "Creation time out of range, skipping record"
                );
                continue;
            }

            let entry = format_record(record, self.config.time_format);
            report.records_included += 1;

            let day = entry.day;
            if buckets
                .entry(day)
                .or_default()
                .insert(entry.sort_key, entry.text)
                .is_some()
            {
                warn!(%day, sort_key = entry.sort_key, "Two records share a time, keeping the older");
            }
        }

        buckets
    }

    fn write_days(
        &self,
        buckets: &BTreeMap<NaiveDate, DayBucket>,
        report: &mut SyncReport,
        written: &mut BTreeSet<NaiveDate>,
    ) {
        let total = buckets.len();

        for (done, (day, bucket)) in buckets.iter().enumerate() {
            match self.write_day(*day, bucket) {
                Ok(()) => {
                    debug!(%day, entries = bucket.len(), "Day written");
                    written.insert(*day);
                }
                Err(e) => {
                    if matches!(e, Error::HeadingNotFound { .. }) {
                        warn!(%day, error = %e, "Skipping day");
                    } else {
                        error!(%day, error = %e, "Skipping day");
                    }
                    report.days_skipped.push(DaySkip {
                        day: *day,
                        reason: e.to_string(),
                    });
                }
            }

            let percent = (done + 1) * 100 / total;
            self.lock_status().progress = u8::try_from(percent).unwrap_or(100);
        }
    }

    fn write_day(&self, day: NaiveDate, bucket: &DayBucket) -> Result<()> {
        let path = journal::resolve(&self.config, day)?;
        let document = read_document(&path)?;

        let section = locate(&document, &self.config.heading_title)?;
        let local = parse_entries(section.body, day, self.config.time_format);
        let body = merge(bucket, &local);

        atomic_write(&path, &render_document(&section, &body))
    }

    fn record_run(&self, key: &str, report: &SyncReport, started_ms: i64) {
        let run = SyncRunRecord {
            id: report.run_id.clone(),
            cursor_key: key.to_string(),
            scope: report.scope.to_string(),
            outcome: report.outcome.as_str().to_string(),
            pages: report.pages,
            records_included: report.records_included,
            days_written: report.days_written,
            days_skipped: u32::try_from(report.days_skipped.len()).unwrap_or(u32::MAX),
            cursor_advanced: report.cursor_advanced,
            error: report.error.clone(),
            started_at: started_ms,
            finished_at: Local::now().timestamp_millis(),
        };

        if let Err(e) = self.lock_storage().record_run(&run) {
            warn!(error = %e, "Could not record sync history");
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, SyncStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_storage(&self) -> std::sync::MutexGuard<'_, SqliteStorage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
