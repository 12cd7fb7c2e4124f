//! Storage module for persisting quotations
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Quote CRUD shared by the API server and the crawler
//! - Crawl run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{QuoteStore, StorageError, StorageResult};

use crate::QuotebookError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Initializes or opens a quote store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `busy_timeout` - How long to wait on a database locked by another writer
pub fn open_store(path: &Path, busy_timeout: Duration) -> Result<SqliteStore, QuotebookError> {
    SqliteStore::new(path, busy_timeout)
}

/// A persisted quotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub id: i64,
    pub text: String,
    pub author: String,
    /// Comma-joined tag tokens; tags containing commas are not escaped
    pub tags: String,
}

/// Quote fields without an id, as submitted for insert or update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    pub text: String,
    pub author: String,
    pub tags: String,
}

impl NewQuote {
    pub fn new(text: impl Into<String>, author: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            tags: tags.into(),
        }
    }

    /// Attaches an assigned id
    pub fn with_id(self, id: i64) -> QuoteRecord {
        QuoteRecord {
            id,
            text: self.text,
            author: self.author,
            tags: self.tags,
        }
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub start_url: String,
    pub status: RunStatus,
    pub pages_visited: u32,
    pub quotes_inserted: u64,
    pub extraction_faults: u64,
    pub error_message: Option<String>,
}

/// Final figures written when a run finishes
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub pages_visited: u32,
    pub quotes_inserted: u64,
    pub extraction_faults: u64,
    pub error_message: Option<String>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
