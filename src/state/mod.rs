//! State module for tracking crawl progress
//!
//! `CrawlState` is the crawl driver's state machine. The driver moves through
//! it one page at a time and rejects transitions the machine does not allow.

mod crawl_state;

pub use crawl_state::CrawlState;
