//! Paginated ingestion: remote source → normalization → store.
//!
//! The [`Ingestor`] walks the remote collection one bounded page at a time,
//! threading an explicit [`PaginationCursor`] through the loop:
//!
//! ```text
//! ┌──────────────┐  PageRequest   ┌──────────────┐  Project   ┌──────────────┐
//! │ RemoteSource │ ◀───────────── │   Ingestor   │ ─────────▶ │ ProjectStore │
//! │  (HTTP/JSON) │ ─────────────▶ │ cursor+retry │   upsert   │   (SQLite)   │
//! └──────────────┘      Page      └──────────────┘            └──────────────┘
//! ```
//!
//! # Termination
//!
//! A run ends when the cursor reaches `min(max_records, reported total)`,
//! when the source returns an empty page or a page shorter than requested,
//! when the cancel flag is raised between pages, or on an error. The
//! reported total is refreshed from every page; if it shrinks below what
//! has been written, the run simply stops. Nothing written is removed.
//!
//! # Failures
//!
//! Transient fetch failures are retried `max_retries` times. Every other
//! failure ends the run immediately. Either way the caller gets an
//! [`IngestFailure`] carrying the report of work already committed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, MAX_PAGE_SIZE};
use crate::error::{IngestError, IngestFailure};
use crate::models::{Page, Project};
use crate::normalize::normalize;
use crate::progress::{NoProgress, ProgressMode, ScrapeProgressEvent, ScrapeProgressReporter};
use crate::source::{HttpSource, PageRequest, RemoteSource};
use crate::store::memory::InMemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::ProjectStore;

/// Parameters of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Requested page size. Values above [`MAX_PAGE_SIZE`] are clamped.
    pub batch_size: u32,
    /// Pause between successful pages.
    pub delay: Duration,
    /// Upper bound on records to fetch. Must be positive when set.
    pub max_records: Option<i64>,
    /// Extra attempts per page after a transient failure.
    pub max_retries: u32,
    /// Minimum pause before a retry.
    pub retry_backoff: Duration,
}

impl IngestOptions {
    /// Build run options from config. A delay that is negative, NaN or
    /// too large for a [`Duration`] is a configuration error.
    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        let delay_secs = config.scrape.delay_secs;
        let delay = Duration::try_from_secs_f64(delay_secs).map_err(|e| {
            IngestError::configuration(format!(
                "delay must be a non-negative number of seconds, got {}: {}",
                delay_secs, e
            ))
        })?;

        let options = Self {
            batch_size: config.scrape.batch_size,
            delay,
            max_records: config.scrape.max_records,
            max_retries: config.source.max_retries,
            retry_backoff: Duration::from_millis(config.source.retry_backoff_ms),
        };
        options.check()?;
        Ok(options)
    }

    /// Rejects limits no run can satisfy.
    pub fn check(&self) -> Result<(), IngestError> {
        if let Some(max) = self.max_records {
            if max <= 0 {
                return Err(IngestError::configuration(format!(
                    "max-records must be positive, got {}",
                    max
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(IngestError::configuration("batch-size must be at least 1"));
        }
        Ok(())
    }

    fn retry_pause(&self) -> Duration {
        self.delay.max(self.retry_backoff)
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `max_records` or the source's reported total was reached.
    TargetReached,
    /// The source returned an empty page.
    EndOfData,
    /// The source returned fewer records than requested.
    ShortPage,
    /// The cancel flag was raised between pages.
    Cancelled,
    /// An error ended the run.
    Failed,
}

/// Caller-visible outcome of a run, complete or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub records_written: u64,
    /// Every fetch call, including failed attempts.
    pub pages_attempted: u32,
    pub pages_fetched: u32,
    pub retries: u32,
    /// Rate-limit pauses taken between pages.
    pub pauses: u32,
    /// Effective page size after clamping.
    pub batch_size: u32,
    /// The caller's page size, when it had to be clamped.
    pub requested_batch_size: Option<u32>,
    /// Last total-count hint seen from the source.
    pub source_total: Option<u64>,
    pub stop_reason: Option<StopReason>,
}

impl IngestReport {
    fn new(batch_size: u32) -> Self {
        Self {
            records_written: 0,
            pages_attempted: 0,
            pages_fetched: 0,
            retries: 0,
            pauses: 0,
            batch_size,
            requested_batch_size: None,
            source_total: None,
            stop_reason: None,
        }
    }
}

/// Offset state for one run. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub offset: u64,
    pub page_size: u32,
    /// Latest total-count hint from the source.
    pub total_expected: Option<u64>,
    pub records_fetched: u64,
}

impl PaginationCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            offset: 0,
            page_size,
            total_expected: None,
            records_fetched: 0,
        }
    }

    /// `min(max_records, total_expected)`, or whichever of the two is known.
    pub fn target(&self, max_records: Option<u64>) -> Option<u64> {
        match (max_records, self.total_expected) {
            (Some(max), Some(total)) => Some(max.min(total)),
            (max, total) => max.or(total),
        }
    }

    /// The next page to ask for, or `None` once the target is reached.
    pub fn next_request(&self, max_records: Option<u64>) -> Option<PageRequest> {
        let size = match self.target(max_records) {
            Some(target) => {
                let remaining = target.saturating_sub(self.records_fetched);
                if remaining == 0 {
                    return None;
                }
                remaining.min(self.page_size as u64) as u32
            }
            None => self.page_size,
        };
        Some(PageRequest {
            offset: self.offset,
            size,
        })
    }

    /// Move past `received` records and adopt the page's total hint.
    pub fn advance(&mut self, received: u64, reported_total: Option<u64>) {
        self.offset += received;
        self.records_fetched += received;
        if reported_total.is_some() {
            self.total_expected = reported_total;
        }
    }
}

/// Cooperative cancellation, checked between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a run from a [`RemoteSource`] into a [`ProjectStore`].
pub struct Ingestor<'a> {
    source: &'a dyn RemoteSource,
    store: &'a dyn ProjectStore,
    progress: &'a dyn ScrapeProgressReporter,
    cancel: CancelFlag,
}

impl<'a> Ingestor<'a> {
    pub fn new(source: &'a dyn RemoteSource, store: &'a dyn ProjectStore) -> Self {
        Self {
            source,
            store,
            progress: &NoProgress,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ScrapeProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run ingestion to completion.
    ///
    /// Parameters are validated before the first request: `max_records`
    /// must be positive and `batch_size` non-zero. A `batch_size` above
    /// [`MAX_PAGE_SIZE`] is clamped, logged, and recorded in the report.
    #[instrument(skip_all, fields(batch_size = options.batch_size, max_records = ?options.max_records))]
    pub async fn run(&self, options: &IngestOptions) -> Result<IngestReport, IngestFailure> {
        let (batch_size, requested) = match validate(options) {
            Ok(sizes) => sizes,
            Err(error) => {
                return Err(IngestFailure {
                    report: IngestReport::new(options.batch_size),
                    error,
                })
            }
        };

        let mut report = IngestReport::new(batch_size);
        report.requested_batch_size = requested;

        let max_records = options.max_records.map(|m| m as u64);
        let mut cursor = PaginationCursor::new(batch_size);

        info!(batch_size, "starting scrape");

        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            let Some(request) = cursor.next_request(max_records) else {
                break StopReason::TargetReached;
            };

            let mut page = match self.fetch_with_retry(request, options, &mut report).await {
                Ok(page) => page,
                Err(error) => return Err(fail(report, error)),
            };
            report.pages_fetched += 1;
            if page.total.is_some() {
                report.source_total = page.total;
            }

            if page.records.is_empty() {
                info!(offset = request.offset, "no more projects to fetch");
                break StopReason::EndOfData;
            }
            if page.records.len() > request.size as usize {
                warn!(
                    offset = request.offset,
                    requested = request.size,
                    received = page.records.len(),
                    "source returned more records than requested, keeping the requested amount"
                );
                page.records.truncate(request.size as usize);
            }

            let received = page.records.len() as u64;
            if let Err(error) = self.write_page(&page, request, &mut report).await {
                return Err(fail(report, error));
            }
            cursor.advance(received, page.total);

            debug!(
                offset = request.offset,
                received,
                written = report.records_written,
                total = ?cursor.total_expected,
                "page stored"
            );
            self.progress.report(ScrapeProgressEvent::Page {
                offset: request.offset,
                received,
                written: report.records_written,
                target: cursor.target(max_records),
            });

            if received < request.size as u64 {
                info!(offset = cursor.offset, "reached the end of available data");
                break StopReason::ShortPage;
            }
            if cursor.next_request(max_records).is_none() {
                break StopReason::TargetReached;
            }
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            report.pauses += 1;
            tokio::time::sleep(options.delay).await;
        };

        report.stop_reason = Some(stop);
        info!(
            records_written = report.records_written,
            pages_attempted = report.pages_attempted,
            stop_reason = ?stop,
            "scrape finished"
        );
        Ok(report)
    }

    async fn fetch_with_retry(
        &self,
        request: PageRequest,
        options: &IngestOptions,
        report: &mut IngestReport,
    ) -> Result<Page, IngestError> {
        let max_attempts = options.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            report.pages_attempted += 1;

            match self.source.fetch_page(request).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        offset = request.offset,
                        size = request.size,
                        attempt,
                        max_attempts,
                        error = %err,
                        "page fetch failed, retrying"
                    );
                    self.progress.report(ScrapeProgressEvent::Retrying {
                        offset: request.offset,
                        attempt,
                        max_attempts,
                        reason: err.to_string(),
                    });
                    report.retries += 1;
                    tokio::time::sleep(options.retry_pause()).await;
                }
                Err(err) => {
                    return Err(IngestError::from_fetch(
                        err,
                        request.offset,
                        request.size,
                        attempt,
                    ))
                }
            }
        }
    }

    /// Normalize the whole page before writing any of it, so a malformed
    /// record never leaves half a page behind.
    async fn write_page(
        &self,
        page: &Page,
        request: PageRequest,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let projects = page
            .records
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                normalize(raw).map_err(|reason| IngestError::MalformedResponse {
                    offset: request.offset,
                    batch_size: request.size,
                    message: format!("record {} of page: {}", i, reason),
                })
            })
            .collect::<Result<Vec<Project>, _>>()?;

        for project in &projects {
            self.store
                .upsert(project)
                .await
                .map_err(|e| IngestError::StoreWrite {
                    project_id: project.project_id.clone(),
                    offset: request.offset,
                    source: e.into(),
                })?;
            report.records_written += 1;
        }
        Ok(())
    }
}

fn validate(options: &IngestOptions) -> Result<(u32, Option<u32>), IngestError> {
    options.check()?;
    if options.batch_size > MAX_PAGE_SIZE {
        warn!(
            requested = options.batch_size,
            ceiling = MAX_PAGE_SIZE,
            "batch size exceeds the source's page-size ceiling, clamping"
        );
        return Ok((MAX_PAGE_SIZE, Some(options.batch_size)));
    }
    Ok((options.batch_size, None))
}

fn fail(mut report: IngestReport, error: IngestError) -> IngestFailure {
    report.stop_reason = Some(StopReason::Failed);
    warn!(
        records_written = report.records_written,
        error = %error,
        "scrape stopped on error"
    );
    IngestFailure { report, error }
}

/// CLI entry point for `tdlr scrape`.
///
/// Opens the store once, runs the ingestor against the configured HTTP
/// endpoint, prints the report, and closes the store on every path. With
/// `dry_run` the pages are fetched but written to an in-memory store.
pub async fn run_scrape(
    config: &Config,
    progress: ProgressMode,
    dry_run: bool,
    cancel: CancelFlag,
) -> Result<IngestReport> {
    let options = IngestOptions::from_config(config)?;
    let source = HttpSource::new(&config.source)?;
    let reporter = progress.reporter();

    let outcome = if dry_run {
        let store = InMemoryStore::new();
        Ingestor::new(&source, &store)
            .with_progress(reporter.as_ref())
            .with_cancel(cancel)
            .run(&options)
            .await
    } else {
        let store = SqliteStore::open(&config.db.path).await?;
        info!(db = %config.db.path.display(), endpoint = source.endpoint(), "database ready");
        let outcome = Ingestor::new(&source, &store)
            .with_progress(reporter.as_ref())
            .with_cancel(cancel)
            .run(&options)
            .await;
        store.close().await;
        outcome
    };

    match outcome {
        Ok(report) => {
            print_report(&report, dry_run);
            println!("ok");
            Ok(report)
        }
        Err(failure) => {
            print_report(&failure.report, dry_run);
            Err(failure.into())
        }
    }
}

fn print_report(report: &IngestReport, dry_run: bool) {
    if dry_run {
        println!("scrape (dry-run)");
    } else {
        println!("scrape");
    }
    if let Some(requested) = report.requested_batch_size {
        println!(
            "  note: batch size {} clamped to {}",
            requested, report.batch_size
        );
    }
    if let Some(total) = report.source_total {
        println!("  records available: {}", total);
    }
    println!("  pages attempted: {}", report.pages_attempted);
    println!("  retries: {}", report.retries);
    if dry_run {
        println!("  records fetched: {}", report.records_written);
    } else {
        println!("  records written: {}", report.records_written);
    }
    if let Some(reason) = report.stop_reason {
        let reason = match reason {
            StopReason::TargetReached => "requested limit reached",
            StopReason::EndOfData => "no more projects",
            StopReason::ShortPage => "reached the end of available data",
            StopReason::Cancelled => "interrupted",
            StopReason::Failed => "failed",
        };
        println!("  stopped: {}", reason);
    }
}
