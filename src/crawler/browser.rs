//! Browser session used by the crawler
//!
//! The crawler only needs a small capability set: load a URL, take a snapshot
//! of the rendered DOM, click an element, and shut down. `ChromeSession`
//! provides it with a headless Chrome instance; tests provide scripted
//! sessions.

use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use thiserror::Error;

/// Browser or network failure during a crawl
///
/// Any of these ends the crawl; records already inserted are kept.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser session failed: {0}")]
    Session(String),
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Capability the crawl driver needs from a browser
pub trait BrowserSession {
    /// Loads `url` and waits for the navigation to complete
    fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Returns the current rendered DOM as HTML
    fn page_source(&mut self) -> BrowserResult<String>;

    /// Clicks the first element matching `selector`
    ///
    /// Returns `Ok(false)` when no such element can be located. That is the
    /// normal end of pagination, not an error.
    fn click(&mut self, selector: &str) -> BrowserResult<bool>;

    /// Releases the session. Called once, on every exit path.
    fn close(&mut self) -> BrowserResult<()>;
}

/// Headless Chrome implementation of `BrowserSession`
pub struct ChromeSession {
    // Dropping the browser kills the Chrome process
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Starts Chrome and opens a tab
    pub fn launch(headless: bool) -> BrowserResult<Self> {
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        tracing::debug!("Launched Chrome session (headless: {})", headless);

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn page_source(&mut self) -> BrowserResult<String> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::Session(e.to_string()))
    }

    fn click(&mut self, selector: &str) -> BrowserResult<bool> {
        let element = match self.tab.find_element(selector) {
            Ok(element) => element,
            Err(e) if is_missing_element(&e) => {
                tracing::debug!("No element matches '{}': {}", selector, e);
                return Ok(false);
            }
            Err(e) => {
                return Err(BrowserError::Session(format!(
                    "looking up '{}' failed: {}",
                    selector, e
                )))
            }
        };

        element
            .click()
            .map_err(|e| BrowserError::Session(format!("click on '{}' failed: {}", selector, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::Session(e.to_string()))?;

        Ok(true)
    }

    fn close(&mut self) -> BrowserResult<()> {
        if self.browser.is_none() {
            return Ok(());
        }

        let result = self.tab.close(true);
        self.browser = None;

        result
            .map(|_| ())
            .map_err(|e| BrowserError::Session(format!("closing tab failed: {}", e)))
    }
}

/// Only a failed query means the element is absent; a lost connection to
/// the browser surfaces as some other error
fn is_missing_element(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NoElementFound>().is_some()
}
