//! Quotebook main entry point
//!
//! This is the command-line interface for the quote store: it serves the
//! HTTP API, runs the scraping job, reports statistics, and talks to a
//! running server as a client.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use quotebook::client::QuoteClient;
use quotebook::config::{load_config_with_hash, validate, Config};
use quotebook::crawler::{crawl, CancelToken};
use quotebook::output::{load_statistics, print_statistics};
use quotebook::storage::{open_store, NewQuote, QuoteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Quotebook: a quotation store fed by a headless-browser scraper
#[derive(Parser, Debug)]
#[command(name = "quotebook")]
#[command(version = "1.0.0")]
#[command(about = "Scrape, store and serve quotations", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the quotes API
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,

        /// SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Scrape the quote listing into the store
    Crawl {
        /// Maximum number of pages to visit
        #[arg(long)]
        pages: Option<u32>,

        /// SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Show store and crawl statistics
    Stats {
        /// SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Call a running quotes API
    Client {
        /// Base URL of the API
        #[arg(long)]
        api_url: Option<String>,

        #[command(subcommand)]
        action: ClientAction,
    },
}

#[derive(Subcommand, Debug)]
enum ClientAction {
    /// List all quotes
    List,

    /// Add a quote
    Add {
        #[arg(long)]
        text: String,
        #[arg(long)]
        author: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Replace a quote's fields
    Update {
        id: i64,
        #[arg(long)]
        text: String,
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Delete a quote
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match &cli.config {
        Some(path) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            config_hash
        ),
        None => tracing::debug!("Using built-in configuration"),
    }

    match cli.command {
        Command::Serve { bind, database } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            override_database(&mut config, database);
            validate(&config).context("Invalid command-line override")?;
            handle_serve(&config).await
        }
        Command::Crawl { pages, database } => {
            if let Some(pages) = pages {
                config.crawler.page_cap = pages;
            }
            override_database(&mut config, database);
            validate(&config).context("Invalid command-line override")?;
            handle_crawl(config, config_hash).await
        }
        Command::Stats { database } => {
            override_database(&mut config, database);
            validate(&config).context("Invalid command-line override")?;
            handle_stats(&config)
        }
        Command::Client { api_url, action } => {
            if let Some(api_url) = api_url {
                config.client.api_url = api_url;
            }
            validate(&config).context("Invalid command-line override")?;
            handle_client(&config, action).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "quotebook=info,tower_http=info,warn",
            1 => "quotebook=debug,tower_http=debug,info",
            2 => "quotebook=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn override_database(config: &mut Config, database: Option<PathBuf>) {
    if let Some(path) = database {
        config.store.database_path = path.to_string_lossy().into_owned();
    }
}

fn open_configured_store(config: &Config) -> anyhow::Result<Arc<dyn QuoteStore>> {
    let path = Path::new(&config.store.database_path);
    let store = open_store(path, Duration::from_millis(config.store.busy_timeout_ms))
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Handles the `serve` command: runs the API until Ctrl-C
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let store = open_configured_store(config)?;
    tracing::info!("Database: {}", config.store.database_path);

    quotebook::server::serve(&config.server, store)
        .await
        .context("Quotes API failed")?;
    Ok(())
}

/// Handles the `crawl` command
///
/// The crawl runs on a blocking thread; Ctrl-C raises the cancel token so the
/// run ends as interrupted with the browser closed.
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let store = open_configured_store(&config)?;

    tracing::info!(
        "Starting crawl of {} (page cap: {}, settle: {:?})",
        config.crawler.start_url,
        config.crawler.page_cap,
        config.crawler.settle_mode
    );

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            signal_cancel.cancel();
        }
    });

    let report = tokio::task::spawn_blocking(move || crawl(&config, &config_hash, store, cancel))
        .await
        .context("Crawl task panicked")?
        .context("Crawl could not start")?;

    println!(
        "Crawl {}: {} pages, {} quotes inserted, {} skipped ({})",
        report.status.to_db_string(),
        report.pages_visited,
        report.quotes_inserted,
        report.extraction_faults,
        report.stop_reason
    );

    if !report.is_success() {
        match report.error {
            Some(error) => bail!("Crawl {}: {}", report.status.to_db_string(), error),
            None => bail!("Crawl {}", report.status.to_db_string()),
        }
    }

    Ok(())
}

/// Handles the `stats` command
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.store.database_path);

    let store = open_configured_store(config)?;
    let stats = load_statistics(store.as_ref()).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the `client` command: one call, one status line
async fn handle_client(config: &Config, action: ClientAction) -> anyhow::Result<()> {
    let client = QuoteClient::from_config(&config.client)?;

    let result = match action {
        ClientAction::List => client.list_quotes().await.map(|quotes| {
            for quote in &quotes {
                println!(
                    "{:>5}  {}  -- {} [{}]",
                    quote.id, quote.text, quote.author, quote.tags
                );
            }
            format!("{} quotes", quotes.len())
        }),
        ClientAction::Add { text, author, tags } => client
            .create_quote(&NewQuote::new(text, author, tags))
            .await
            .map(|quote| format!("Created quote {}", quote.id)),
        ClientAction::Update {
            id,
            text,
            author,
            tags,
        } => client
            .update_quote(id, &NewQuote::new(text, author, tags))
            .await
            .map(|quote| format!("Updated quote {}", quote.id)),
        ClientAction::Delete { id } => client
            .delete_quote(id)
            .await
            .map(|()| format!("Deleted quote {}", id)),
    };

    match result {
        Ok(status) => {
            println!("{}", status);
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            bail!("{} (is the server running at {}?)", e, client.base_url())
        }
        Err(e) => Err(e.into()),
    }
}
