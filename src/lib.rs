//! Quotebook: a quotation store fed by a headless-browser scraper
//!
//! This crate crawls a paginated, JavaScript-rendered quotation listing,
//! loads the extracted records into a SQLite store, and serves that store
//! through a small HTTP CRUD API.

pub mod client;
pub mod config;
pub mod crawler;
pub mod output;
pub mod server;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Quotebook operations
#[derive(Debug, Error)]
pub enum QuotebookError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Browser error: {0}")]
    Browser(#[from] crawler::BrowserError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Quotebook operations
pub type Result<T> = std::result::Result<T, QuotebookError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::CrawlState;
pub use storage::{NewQuote, QuoteRecord, QuoteStore, SqliteStore};
