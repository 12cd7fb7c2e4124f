//! Integration tests for the crawler
//!
//! These tests drive the full page loop against scripted browser sessions
//! and a real SQLite store on disk.

use quotebook::config::{Config, SettleMode};
use quotebook::crawler::{
    BrowserError, BrowserResult, BrowserSession, CancelToken, Coordinator, StopReason,
};
use quotebook::storage::{open_store, QuoteStore, RunStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// What the scripted browser was asked to do
#[derive(Debug, Default)]
struct BrowserLog {
    navigations: Vec<String>,
    clicks: usize,
    closed: bool,
}

/// Serves a fixed list of pages; clicking "next" moves to the following one
struct ScriptedBrowser {
    pages: Vec<String>,
    current: usize,
    log: Arc<Mutex<BrowserLog>>,
    /// Snapshot reads on the current page that return an empty body first
    render_lag: usize,
    reads_on_page: usize,
    /// Page index (zero-based) whose snapshot fails
    fail_on: Option<usize>,
    /// Raised when the browser arrives on this page index
    cancel_on: Option<(usize, CancelToken)>,
    /// Click reports "no such element" instead of advancing
    click_finds_nothing: bool,
    /// Click fails as if the browser connection dropped
    click_error: bool,
}

impl ScriptedBrowser {
    fn new(pages: Vec<String>) -> (Self, Arc<Mutex<BrowserLog>>) {
        let log = Arc::new(Mutex::new(BrowserLog::default()));
        let browser = Self {
            pages,
            current: 0,
            log: log.clone(),
            render_lag: 0,
            reads_on_page: 0,
            fail_on: None,
            cancel_on: None,
            click_finds_nothing: false,
            click_error: false,
        };
        (browser, log)
    }
}

impl BrowserSession for ScriptedBrowser {
    fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        self.current = 0;
        self.reads_on_page = 0;
        Ok(())
    }

    fn page_source(&mut self) -> BrowserResult<String> {
        if self.fail_on == Some(self.current) {
            return Err(BrowserError::Session("connection reset".to_string()));
        }

        self.reads_on_page += 1;
        if self.reads_on_page <= self.render_lag {
            return Ok("<html><body></body></html>".to_string());
        }
        Ok(self.pages[self.current].clone())
    }

    fn click(&mut self, _selector: &str) -> BrowserResult<bool> {
        if self.click_error {
            return Err(BrowserError::Session(
                "underlying connection is closed".to_string(),
            ));
        }
        if self.click_finds_nothing {
            return Ok(false);
        }

        self.log.lock().unwrap().clicks += 1;
        self.current += 1;
        self.reads_on_page = 0;

        if let Some((page, cancel)) = &self.cancel_on {
            if *page == self.current {
                cancel.cancel();
            }
        }
        Ok(true)
    }

    fn close(&mut self) -> BrowserResult<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Builds a listing page with `count` quotes
fn listing_page(number: usize, count: usize, has_next: bool) -> String {
    let quotes: String = (0..count)
        .map(|i| {
            format!(
                r#"<div class="quote">
                    <span class="text">Quote {}.{}</span>
                    <span>by <small class="author">Author {}</small></span>
                    <div class="tags"><a class="tag">p{}</a><a class="tag">q{}</a></div>
                </div>"#,
                number, i, i, number, i
            )
        })
        .collect();

    let pager = if has_next {
        format!(
            r#"<ul class="pager"><li class="next"><a href="/js/page/{}/">Next</a></li></ul>"#,
            number + 1
        )
    } else {
        r#"<ul class="pager"><li class="previous"><a href="/js/">Previous</a></li></ul>"#
            .to_string()
    };

    format!(
        "<html><body><div class=\"container\">{}<nav>{}</nav></div></body></html>",
        quotes, pager
    )
}

fn test_config(page_cap: u32) -> Config {
    let mut config = Config::default();
    config.crawler.start_url = "http://quotes.test/js/".to_string();
    config.crawler.page_cap = page_cap;
    config.crawler.settle_mode = SettleMode::Fixed;
    config.crawler.settle_delay_ms = 0;
    config
}

fn temp_store() -> (TempDir, Arc<dyn QuoteStore>) {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir.path().join("quotes.db"), Duration::from_secs(5)).unwrap();
    (dir, Arc::new(store))
}

#[test]
fn test_stops_on_last_page() {
    let (_dir, store) = temp_store();
    let pages = vec![
        listing_page(1, 2, true),
        listing_page(2, 2, true),
        listing_page(3, 2, false),
    ];
    let (browser, log) = ScriptedBrowser::new(pages);

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stop_reason, StopReason::NoNextPage);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.quotes_inserted, 6);

    let log = log.lock().unwrap();
    assert_eq!(log.navigations, vec!["http://quotes.test/js/".to_string()]);
    assert_eq!(log.clicks, 2);
    assert!(log.closed);

    let quotes = store.list_quotes().unwrap();
    let texts: Vec<_> = quotes.iter().map(|q| q.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Quote 1.0", "Quote 1.1", "Quote 2.0", "Quote 2.1", "Quote 3.0", "Quote 3.1"]
    );
    assert_eq!(quotes[0].tags, "p1,q0");
}

#[test]
fn test_page_cap_bounds_crawl() {
    let (_dir, store) = temp_store();
    let pages = (1..=8).map(|n| listing_page(n, 1, true)).collect();
    let (browser, log) = ScriptedBrowser::new(pages);

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stop_reason, StopReason::PageCap);
    assert_eq!(report.pages_visited, 5);
    assert_eq!(store.count_quotes().unwrap(), 5);

    let log = log.lock().unwrap();
    assert_eq!(log.clicks, 4);
    assert!(log.closed);
}

#[test]
fn test_transport_failure_keeps_earlier_records() {
    let (_dir, store) = temp_store();
    let pages = (1..=5).map(|n| listing_page(n, 3, true)).collect();
    let (mut browser, log) = ScriptedBrowser::new(pages);
    browser.fail_on = Some(2);

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.stop_reason, StopReason::Failed);
    assert_eq!(report.pages_visited, 2);
    assert!(report.error.as_deref().unwrap().contains("connection reset"));

    assert_eq!(store.count_quotes().unwrap(), 6);
    assert!(log.lock().unwrap().closed);

    let run = store.get_run(report.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.quotes_inserted, 6);
    assert!(run.error_message.unwrap().contains("connection reset"));
}

#[test]
fn test_malformed_quote_is_skipped() {
    let (_dir, store) = temp_store();
    let page = listing_page(1, 3, false).replace(
        "<nav>",
        r#"<div class="quote"><span class="text">Orphan</span></div><nav>"#,
    );
    let (browser, _log) = ScriptedBrowser::new(vec![page]);

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.quotes_inserted, 3);
    assert_eq!(report.extraction_faults, 1);
    assert!(store
        .list_quotes()
        .unwrap()
        .iter()
        .all(|q| q.text != "Orphan"));
}

#[test]
fn test_cancellation_interrupts_run() {
    let (_dir, store) = temp_store();
    let cancel = CancelToken::new();
    let pages = (1..=5).map(|n| listing_page(n, 2, true)).collect();
    let (mut browser, log) = ScriptedBrowser::new(pages);
    browser.cancel_on = Some((1, cancel.clone()));

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .with_cancel_token(cancel)
        .run();

    assert_eq!(report.status, RunStatus::Interrupted);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(store.count_quotes().unwrap(), 2);
    assert!(log.lock().unwrap().closed);

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

#[test]
fn test_poll_settle_waits_for_late_render() {
    let (_dir, store) = temp_store();
    let pages = vec![listing_page(1, 10, true), listing_page(2, 10, false)];
    let (mut browser, _log) = ScriptedBrowser::new(pages);
    browser.render_lag = 3;

    let mut config = test_config(5);
    config.crawler.settle_mode = SettleMode::Poll;
    config.crawler.poll_interval_ms = 1;
    config.crawler.max_settle_ms = 2000;

    let report = Coordinator::new(&config, "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(store.count_quotes().unwrap(), 20);
}

#[test]
fn test_missing_next_element_ends_crawl() {
    let (_dir, store) = temp_store();
    let pages = (1..=3).map(|n| listing_page(n, 1, true)).collect();
    let (mut browser, _log) = ScriptedBrowser::new(pages);
    browser.click_finds_nothing = true;

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stop_reason, StopReason::NoNextPage);
    assert_eq!(report.pages_visited, 1);
}

#[test]
fn test_click_failure_fails_run() {
    let (_dir, store) = temp_store();
    let pages = (1..=3).map(|n| listing_page(n, 2, true)).collect();
    let (mut browser, log) = ScriptedBrowser::new(pages);
    browser.click_error = true;

    let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.stop_reason, StopReason::Failed);
    assert!(!report.is_success());
    assert_eq!(report.pages_visited, 1);
    assert!(report.error.as_deref().unwrap().contains("connection is closed"));

    assert_eq!(store.count_quotes().unwrap(), 2);
    assert!(log.lock().unwrap().closed);

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[test]
fn test_huge_timeout_means_no_deadline() {
    let (_dir, store) = temp_store();
    let mut config = quotebook::config::parse_config(
        "[crawler]\nstart-url = \"http://quotes.test/js/\"\ntimeout-secs = 9223372036854775807\n",
    )
    .unwrap();
    config.crawler.settle_mode = SettleMode::Fixed;
    config.crawler.settle_delay_ms = 0;
    let (browser, _log) = ScriptedBrowser::new(vec![listing_page(1, 2, false)]);

    let report = Coordinator::new(&config, "hash", browser, store.clone())
        .unwrap()
        .run();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stop_reason, StopReason::NoNextPage);
    assert_eq!(store.count_quotes().unwrap(), 2);
}

#[test]
fn test_run_row_records_outcome() {
    let (_dir, store) = temp_store();
    let (browser, _log) = ScriptedBrowser::new(vec![listing_page(1, 4, false)]);

    let report = Coordinator::new(&test_config(5), "abc123", browser, store.clone())
        .unwrap()
        .run();

    let run = store.get_run(report.run_id.unwrap()).unwrap();
    assert_eq!(run.config_hash, "abc123");
    assert_eq!(run.start_url, "http://quotes.test/js/");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_visited, 1);
    assert_eq!(run.quotes_inserted, 4);
    assert_eq!(run.extraction_faults, 0);
    assert!(run.finished_at.is_some());
}

#[test]
fn test_second_crawl_appends() {
    let (_dir, store) = temp_store();

    for _ in 0..2 {
        let (browser, _log) = ScriptedBrowser::new(vec![listing_page(1, 2, false)]);
        let report = Coordinator::new(&test_config(5), "hash", browser, store.clone())
            .unwrap()
            .run();
        assert!(report.is_success());
    }

    assert_eq!(store.count_quotes().unwrap(), 4);
    assert_eq!(store.list_runs(10).unwrap().len(), 2);
}
