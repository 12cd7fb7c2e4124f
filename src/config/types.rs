use serde::Deserialize;

/// Main configuration structure for Quotebook
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub crawler: CrawlerConfig,
    pub selectors: SelectorConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long a writer waits on a locked database before failing (milliseconds)
    #[serde(rename = "busy-timeout-ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "quotes.db".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

/// How the crawler decides a page has finished rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// Sleep for `settle-delay-ms`, then read the page
    Fixed,
    /// Sample the quote count until two consecutive samples agree
    Poll,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First listing page to load
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum number of pages visited in one run
    #[serde(rename = "page-cap")]
    pub page_cap: u32,

    #[serde(rename = "settle-mode")]
    pub settle_mode: SettleMode,

    /// Fixed wait used by `SettleMode::Fixed` (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Interval between samples in `SettleMode::Poll` (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single poll-mode wait (milliseconds)
    #[serde(rename = "max-settle-ms")]
    pub max_settle_ms: u64,

    /// Overall wall-clock budget for one crawl run (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Run the browser without a window
    pub headless: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: "http://quotes.toscrape.com/js/".to_string(),
            page_cap: 5,
            settle_mode: SettleMode::Poll,
            settle_delay_ms: 1000,
            poll_interval_ms: 250,
            max_settle_ms: 5000,
            timeout_secs: 300,
            headless: true,
        }
    }
}

/// CSS selectors used to read the listing pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub quote: String,
    pub text: String,
    pub author: String,
    pub tag: String,
    pub next: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            quote: ".quote".to_string(),
            text: ".text".to_string(),
            author: ".author".to_string(),
            tag: ".tag".to_string(),
            next: "li.next a".to_string(),
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// API client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the quotes API
    #[serde(rename = "api-url")]
    pub api_url: String,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 5,
        }
    }
}
