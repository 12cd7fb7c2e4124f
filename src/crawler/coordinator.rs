//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that coordinates a crawl:
//! - Recording the run in storage
//! - Loading pages and waiting for them to render
//! - Extracting quotes and inserting them
//! - Following the "next page" control up to the page cap
//! - Releasing the browser and flushing the store on every exit path

use crate::config::Config;
use crate::crawler::browser::BrowserSession;
use crate::crawler::parser::{extract_quotes, QuoteSelectors};
use crate::crawler::settle::{wait_for_render, CancelToken, Settle};
use crate::state::CrawlState;
use crate::storage::{QuoteStore, RunStatus, RunSummary};
use crate::QuotebookError;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why the page loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no usable "next page" control
    NoNextPage,
    /// The configured page cap was reached
    PageCap,
    /// The cancel token was raised
    Cancelled,
    /// The overall crawl timeout elapsed
    TimedOut,
    /// A browser, network, or storage failure aborted the crawl
    Failed,
}

impl StopReason {
    /// Run status recorded for this stop reason
    pub fn run_status(&self) -> RunStatus {
        match self {
            Self::NoNextPage | Self::PageCap => RunStatus::Completed,
            Self::Cancelled | Self::TimedOut => RunStatus::Interrupted,
            Self::Failed => RunStatus::Failed,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoNextPage => "no next page",
            Self::PageCap => "page cap reached",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed out",
            Self::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// Outcome of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Run row id, when the run could be recorded
    pub run_id: Option<i64>,
    pub status: RunStatus,
    pub stop_reason: StopReason,
    pub pages_visited: u32,
    pub quotes_inserted: u64,
    pub extraction_faults: u64,
    /// Error that aborted the crawl, for failed runs
    pub error: Option<String>,
}

impl CrawlReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

#[derive(Debug, Default)]
struct Progress {
    pages_visited: u32,
    quotes_inserted: u64,
    extraction_faults: u64,
}

/// Main crawler coordinator structure
pub struct Coordinator<B: BrowserSession> {
    browser: B,
    store: Arc<dyn QuoteStore>,
    selectors: QuoteSelectors,
    start_url: String,
    page_cap: u32,
    settle: Settle,
    timeout: Duration,
    config_hash: String,
    cancel: CancelToken,
    state: CrawlState,
}

impl<B: BrowserSession> Coordinator<B> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler and selector configuration
    /// * `config_hash` - Hash recorded with the run
    /// * `browser` - An open browser session; the coordinator closes it
    /// * `store` - Store the quotes are written to
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(QuotebookError)` - A configured selector does not parse
    pub fn new(
        config: &Config,
        config_hash: impl Into<String>,
        browser: B,
        store: Arc<dyn QuoteStore>,
    ) -> Result<Self, QuotebookError> {
        Ok(Self {
            browser,
            store,
            selectors: QuoteSelectors::from_config(&config.selectors)?,
            start_url: config.crawler.start_url.clone(),
            page_cap: config.crawler.page_cap,
            settle: Settle::from_config(&config.crawler),
            timeout: Duration::from_secs(config.crawler.timeout_secs),
            config_hash: config_hash.into(),
            cancel: CancelToken::new(),
            state: CrawlState::Init,
        })
    }

    /// Uses an externally owned cancel token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Overrides the overall crawl timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current state of the page loop
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Runs the crawl to completion
    ///
    /// Never panics on crawl faults: failures are captured in the report
    /// after the browser has been closed and the store flushed. Quotes
    /// inserted before a failure stay in the store.
    pub fn run(mut self) -> CrawlReport {
        let started = Instant::now();
        let mut progress = Progress::default();

        let run_id = match self.store.create_run(&self.config_hash, &self.start_url) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Could not record crawl run: {}", e);
                None
            }
        };

        tracing::info!(
            run_id = ?run_id,
            "Starting crawl at {} (page cap {})",
            self.start_url,
            self.page_cap
        );

        // A timeout too large to represent means no deadline
        let deadline = started.checked_add(self.timeout);
        let (stop_reason, error) = match self.crawl_pages(&mut progress, deadline) {
            Ok(reason) => (reason, None),
            Err(e) => {
                tracing::error!(
                    "Crawl aborted in state '{}' after {} pages: {}",
                    self.state,
                    progress.pages_visited,
                    e
                );
                (StopReason::Failed, Some(e.to_string()))
            }
        };

        let report = CrawlReport {
            run_id,
            status: stop_reason.run_status(),
            stop_reason,
            pages_visited: progress.pages_visited,
            quotes_inserted: progress.quotes_inserted,
            extraction_faults: progress.extraction_faults,
            error,
        };

        self.shutdown(&report);

        tracing::info!(
            "Crawl finished ({}): {} pages, {} quotes inserted, {} skipped in {:?}",
            report.stop_reason,
            report.pages_visited,
            report.quotes_inserted,
            report.extraction_faults,
            started.elapsed()
        );

        report
    }

    /// The page loop. Returns why it stopped, or the fault that aborted it.
    fn crawl_pages(
        &mut self,
        progress: &mut Progress,
        deadline: Option<Instant>,
    ) -> Result<StopReason, QuotebookError> {
        let mut page = 1;

        if let Some(reason) = self.interrupted(deadline) {
            return Ok(reason);
        }

        self.transition(CrawlState::Loading(page))?;
        self.browser.navigate(&self.start_url)?;

        loop {
            let settled =
                wait_for_render(&mut self.browser, self.settle, &self.selectors, &self.cancel)?;
            if let Some(reason) = self.interrupted(deadline) {
                return Ok(reason);
            }
            if !settled.stable {
                tracing::warn!(page, "Page did not settle; reading what has rendered");
            }

            self.transition(CrawlState::Extracting(page))?;
            progress.pages_visited += 1;

            let extraction = extract_quotes(&settled.html, &self.selectors);
            for fault in &extraction.faults {
                tracing::warn!(page, "Skipping malformed quote: {}", fault);
            }
            progress.extraction_faults += extraction.faults.len() as u64;

            for quote in &extraction.quotes {
                self.store.insert_quote(quote)?;
                progress.quotes_inserted += 1;
            }

            tracing::info!(
                page,
                quotes = extraction.quotes.len(),
                faults = extraction.faults.len(),
                "Page ingested"
            );

            self.transition(CrawlState::Advancing(page))?;

            if page >= self.page_cap {
                tracing::info!("Page cap of {} reached", self.page_cap);
                return Ok(StopReason::PageCap);
            }

            if !extraction.has_next {
                tracing::info!(page, "No next page control; pagination finished");
                return Ok(StopReason::NoNextPage);
            }

            if let Some(reason) = self.interrupted(deadline) {
                return Ok(reason);
            }

            if !self.browser.click(self.selectors.next_selector())? {
                tracing::info!(
                    page,
                    "Next page control could not be located; pagination finished"
                );
                return Ok(StopReason::NoNextPage);
            }

            page += 1;
            self.transition(CrawlState::Loading(page))?;
        }
    }

    fn interrupted(&self, deadline: Option<Instant>) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            tracing::warn!("Crawl cancelled in state '{}'", self.state);
            Some(StopReason::Cancelled)
        } else if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            tracing::warn!(
                "Crawl timed out after {:?} in state '{}'",
                self.timeout,
                self.state
            );
            Some(StopReason::TimedOut)
        } else {
            None
        }
    }

    fn transition(&mut self, next: CrawlState) -> Result<(), QuotebookError> {
        if !self.state.can_transition_to(&next) {
            return Err(QuotebookError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Crawl state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Closes the browser, records the run outcome and flushes the store.
    /// Failures here are logged only.
    fn shutdown(&mut self, report: &CrawlReport) {
        if let Err(e) = self.browser.close() {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        if let Some(run_id) = report.run_id {
            let summary = RunSummary {
                status: report.status,
                pages_visited: report.pages_visited,
                quotes_inserted: report.quotes_inserted,
                extraction_faults: report.extraction_faults,
                error_message: report.error.clone(),
            };
            if let Err(e) = self.store.finish_run(run_id, &summary) {
                tracing::warn!("Could not record end of run {}: {}", run_id, e);
            }
        }

        if let Err(e) = self.store.checkpoint() {
            tracing::warn!("Failed to flush quote store: {}", e);
        }

        if let Err(e) = self.transition(CrawlState::Done) {
            tracing::debug!("{}", e);
        }
    }
}
