//! Waiting for JavaScript-rendered content
//!
//! Listing pages build their quotes client-side, so a snapshot taken right
//! after navigation may be empty or partial. Two strategies are supported:
//! a fixed delay, and polling the quote count until it stops changing.

use crate::config::{CrawlerConfig, SettleMode};
use crate::crawler::browser::{BrowserResult, BrowserSession};
use crate::crawler::parser::{count_quotes, QuoteSelectors};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest single sleep; bounds how late a cancellation is noticed
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared flag that asks a running crawl to stop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
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

/// How to decide a page has rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Sleep, then snapshot
    Fixed(Duration),

    /// Snapshot every `interval` until two consecutive samples report the
    /// same non-zero quote count, giving up after `max`
    Poll { interval: Duration, max: Duration },
}

impl Settle {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        match config.settle_mode {
            SettleMode::Fixed => Self::Fixed(Duration::from_millis(config.settle_delay_ms)),
            SettleMode::Poll => Self::Poll {
                interval: Duration::from_millis(config.poll_interval_ms),
                max: Duration::from_millis(config.max_settle_ms),
            },
        }
    }
}

/// Snapshot taken once a page has settled
#[derive(Debug, Clone)]
pub struct SettledPage {
    pub html: String,

    /// False when polling hit its bound or the wait was cancelled; the HTML
    /// may then be under-rendered
    pub stable: bool,
}

/// Waits for the current page to render and returns its HTML
pub fn wait_for_render<B: BrowserSession + ?Sized>(
    browser: &mut B,
    settle: Settle,
    selectors: &QuoteSelectors,
    cancel: &CancelToken,
) -> BrowserResult<SettledPage> {
    match settle {
        Settle::Fixed(delay) => {
            let completed = sleep_unless_cancelled(delay, cancel);
            Ok(SettledPage {
                html: browser.page_source()?,
                stable: completed,
            })
        }
        Settle::Poll { interval, max } => {
            let started = Instant::now();
            let mut html = browser.page_source()?;
            let mut previous = count_quotes(&html, selectors);

            loop {
                if started.elapsed() >= max || !sleep_unless_cancelled(interval, cancel) {
                    tracing::debug!(
                        "Page did not settle within {:?} ({} quotes seen)",
                        max,
                        previous
                    );
                    return Ok(SettledPage {
                        html,
                        stable: false,
                    });
                }

                html = browser.page_source()?;
                let current = count_quotes(&html, selectors);
                if current > 0 && current == previous {
                    return Ok(SettledPage { html, stable: true });
                }
                previous = current;
            }
        }
    }
}

/// Sleeps for `duration` in short slices. Returns false if cancelled first.
fn sleep_unless_cancelled(duration: Duration, cancel: &CancelToken) -> bool {
    // None: the duration overflows, so only cancellation ends the wait
    let deadline = Instant::now().checked_add(duration);
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        let slice = match deadline {
            Some(deadline) if now >= deadline => return true,
            Some(deadline) => (deadline - now).min(SLEEP_SLICE),
            None => SLEEP_SLICE,
        };
        std::thread::sleep(slice);
    }
}
