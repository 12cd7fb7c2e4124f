//! Crawler module for scraping the quote listing
//!
//! This module contains the ingestion pipeline, including:
//! - A browser session capability and its headless Chrome implementation
//! - Render settling (fixed delay or poll-until-stable)
//! - Quote extraction from rendered HTML
//! - The page loop that ties them to the quote store

mod browser;
mod coordinator;
mod parser;
mod settle;

pub use browser::{BrowserError, BrowserResult, BrowserSession, ChromeSession};
pub use coordinator::{Coordinator, CrawlReport, StopReason};
pub use parser::{
    count_quotes, extract_quotes, ExtractionFault, MissingField, PageExtraction, QuoteSelectors,
    TAG_SEPARATOR,
};
pub use settle::{wait_for_render, CancelToken, Settle, SettledPage};

use crate::config::Config;
use crate::storage::QuoteStore;
use crate::QuotebookError;
use std::sync::Arc;

/// Runs a complete crawl with a headless Chrome session
///
/// This is the blocking entry point used by the CLI. It will:
/// 1. Launch Chrome
/// 2. Walk the listing pages up to the page cap
/// 3. Insert every extracted quote into `store`
/// 4. Close the browser and flush the store
///
/// A browser that fails to launch is returned as an error; faults after
/// launch are reported through the returned `CrawlReport`.
pub fn crawl(
    config: &Config,
    config_hash: &str,
    store: Arc<dyn QuoteStore>,
    cancel: CancelToken,
) -> Result<CrawlReport, QuotebookError> {
    let browser = ChromeSession::launch(config.crawler.headless)?;
    let coordinator =
        Coordinator::new(config, config_hash, browser, store)?.with_cancel_token(cancel);
    Ok(coordinator.run())
}
