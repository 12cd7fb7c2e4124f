//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{NewQuote, QuoteRecord, RunRecord, RunSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Quote {0} not found")]
    NotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Storage connection lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// True when the error means the target record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Methods take `&self` so one store can be shared behind an `Arc` by the
/// API server's request handlers and the crawler. Each mutating method is
/// atomic and committed when it returns `Ok`.
pub trait QuoteStore: Send + Sync {
    // ===== Quotes =====

    /// Returns every quote, ascending by id
    fn list_quotes(&self) -> StorageResult<Vec<QuoteRecord>>;

    /// Gets a quote by id
    fn get_quote(&self, id: i64) -> StorageResult<QuoteRecord>;

    /// Inserts a quote and returns its newly assigned id
    fn insert_quote(&self, quote: &NewQuote) -> StorageResult<i64>;

    /// Replaces text, author and tags of an existing quote
    ///
    /// Fails with `StorageError::NotFound` if no quote has this id; the
    /// existence check and the write are one statement.
    fn update_quote(&self, id: i64, quote: &NewQuote) -> StorageResult<QuoteRecord>;

    /// Deletes a quote, failing with `StorageError::NotFound` if absent
    fn delete_quote(&self, id: i64) -> StorageResult<()>;

    /// Checks whether a quote with this id exists
    fn quote_exists(&self, id: i64) -> StorageResult<bool>;

    /// Counts stored quotes
    fn count_quotes(&self) -> StorageResult<u64>;

    /// Counts distinct authors
    fn count_authors(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&self, config_hash: &str, start_url: &str) -> StorageResult<i64>;

    /// Records the final status and counters of a run
    fn finish_run(&self, run_id: i64, summary: &RunSummary) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Lists the most recent runs, newest first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Maintenance =====

    /// Flushes the write-ahead log into the main database file
    fn checkpoint(&self) -> StorageResult<()>;
}
