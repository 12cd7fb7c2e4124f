//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the QuoteStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{QuoteStore, StorageError, StorageResult};
use crate::storage::{NewQuote, QuoteRecord, RunRecord, RunStatus, RunSummary};
use crate::QuotebookError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, start_url, status,
     pages_visited, quotes_inserted, extraction_faults, error_message";

/// SQLite storage backend
///
/// Owns a single connection behind a mutex. Share one instance per process
/// through an `Arc`; other processes coordinate through SQLite's own locking.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long a statement waits on a lock held by another connection
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(QuotebookError)` - Failed to open database
    pub fn new(path: &Path, busy_timeout: Duration) -> Result<Self, QuotebookError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // WAL lets readers proceed while a writer commits; FULL sync makes
        // every commit durable before the call returns.
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened quote store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, QuotebookError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

/// Tables created by older tooling allow NULL columns; read them as empty
fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<QuoteRecord> {
    Ok(QuoteRecord {
        id: row.get(0)?,
        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        author: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        tags: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        start_url: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Failed),
        pages_visited: row.get(6)?,
        quotes_inserted: row.get::<_, i64>(7)? as u64,
        extraction_faults: row.get::<_, i64>(8)? as u64,
        error_message: row.get(9)?,
    })
}

impl QuoteStore for SqliteStore {
    // ===== Quotes =====

    fn list_quotes(&self) -> StorageResult<Vec<QuoteRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, text, author, tags FROM quotes ORDER BY id")?;

        let quotes = stmt
            .query_map([], quote_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(quotes)
    }

    fn get_quote(&self, id: i64) -> StorageResult<QuoteRecord> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, text, author, tags FROM quotes WHERE id = ?1",
            params![id],
            quote_from_row,
        )
        .optional()?
        .ok_or(StorageError::NotFound(id))
    }

    fn insert_quote(&self, quote: &NewQuote) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO quotes (text, author, tags) VALUES (?1, ?2, ?3)",
            params![quote.text, quote.author, quote.tags],
        )?;
        // The mutex keeps another insert on this connection from moving the rowid
        Ok(conn.last_insert_rowid())
    }

    fn update_quote(&self, id: i64, quote: &NewQuote) -> StorageResult<QuoteRecord> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE quotes SET text = ?1, author = ?2, tags = ?3 WHERE id = ?4",
            params![quote.text, quote.author, quote.tags, id],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(id));
        }

        Ok(quote.clone().with_id(id))
    }

    fn delete_quote(&self, id: i64) -> StorageResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM quotes WHERE id = ?1", params![id])?;

        if changed == 0 {
            return Err(StorageError::NotFound(id));
        }

        Ok(())
    }

    fn quote_exists(&self, id: i64) -> StorageResult<bool> {
        let conn = self.conn()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM quotes WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    fn count_quotes(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_authors(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(DISTINCT author) FROM quotes", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&self, config_hash: &str, start_url: &str) -> StorageResult<i64> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, start_url, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, start_url, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(&self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, pages_visited = ?3,
             quotes_inserted = ?4, extraction_faults = ?5, error_message = ?6 WHERE id = ?7",
            params![
                summary.status.to_db_string(),
                now,
                summary.pages_visited,
                summary.quotes_inserted as i64,
                summary.extraction_faults as i64,
                summary.error_message,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }

        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS),
            params![run_id],
            run_from_row,
        )
        .optional()?
        .ok_or(StorageError::RunNotFound(run_id))
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                &format!(
                    "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Maintenance =====

    fn checkpoint(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }
}
