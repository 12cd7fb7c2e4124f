//! Operator-facing reports on the store contents and crawl history

pub mod stats;

pub use stats::{load_statistics, print_statistics, run_duration_seconds, StoreStatistics};
