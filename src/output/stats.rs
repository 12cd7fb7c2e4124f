//! Statistics generation from the quote store
//!
//! This module provides functionality for extracting and displaying
//! store and crawl-run statistics.

use crate::storage::{QuoteStore, RunRecord, StorageResult};
use chrono::{DateTime, Utc};

/// How many recent runs `load_statistics` collects
const RECENT_RUNS: usize = 5;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored quotes
    pub total_quotes: u64,

    /// Number of distinct authors
    pub distinct_authors: u64,

    /// Most recent crawl runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from the store
pub fn load_statistics(store: &dyn QuoteStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_quotes: store.count_quotes()?,
        distinct_authors: store.count_authors()?,
        recent_runs: store.list_runs(RECENT_RUNS)?,
    })
}

/// Wall-clock length of a finished run
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Quote Store Statistics ===\n");

    println!("Overview:");
    println!("  Total quotes: {}", stats.total_quotes);
    println!("  Distinct authors: {}", stats.distinct_authors);
    println!();

    if stats.recent_runs.is_empty() {
        println!("No crawl runs recorded.");
        return;
    }

    println!("Recent Crawl Runs:");
    for run in &stats.recent_runs {
        let duration = run_duration_seconds(run)
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  #{} {} [{}] pages: {}, quotes: {}, faults: {}, took {}",
            run.id,
            run.started_at,
            run.status.to_db_string(),
            run.pages_visited,
            run.quotes_inserted,
            run.extraction_faults,
            duration
        );
        if let Some(error) = &run.error_message {
            println!("      error: {}", error);
        }
    }
}
