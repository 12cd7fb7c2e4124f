//! Configuration module for Quotebook
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so running without a file is valid.
//!
//! # Example
//!
//! ```no_run
//! use quotebook::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("quotebook.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.page_cap);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClientConfig, Config, CrawlerConfig, SelectorConfig, ServerConfig, SettleMode, StoreConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
