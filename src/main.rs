//! Image Mirror main entry point
//!
//! This is the command-line interface for the Image Mirror ingestion pipeline.

use anyhow::Context;
use clap::Parser;
use image_mirror::config::{load_config_with_hash, Config};
use image_mirror::output::{load_statistics, print_images, print_run_log, print_statistics};
use image_mirror::search::DEFAULT_SEARCH_LIMIT;
use image_mirror::storage::lock_catalog;
use image_mirror::MirrorService;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Image Mirror: mirrors a remote image gallery into a local catalog
///
/// By default runs as a daemon that crawls the remote listing on a fixed
/// interval (and once at startup when the catalog is empty).
#[derive(Parser, Debug)]
#[command(name = "image-mirror")]
#[command(version)]
#[command(about = "Mirrors a remote image gallery into a local catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single crawl and exit
    #[arg(long, conflicts_with_all = ["search", "logs", "stats", "dry_run"])]
    once: bool,

    /// Search image titles and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["once", "logs", "stats", "dry_run"])]
    search: Option<String>,

    /// Show the most recent crawl run logs and exit
    #[arg(long, conflicts_with_all = ["once", "search", "stats", "dry_run"])]
    logs: bool,

    /// Show catalog statistics and exit
    #[arg(long, conflicts_with_all = ["once", "search", "logs", "dry_run"])]
    stats: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["once", "search", "logs", "stats"])]
    dry_run: bool,

    /// Page size for --once, result cap for --search and --logs
    #[arg(long)]
    limit: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let service = MirrorService::open(config).context("Failed to open catalog")?;

    if cli.once {
        handle_once(&service, cli.limit).await
    } else if let Some(query) = &cli.search {
        handle_search(&service, query, cli.limit)
    } else if cli.logs {
        handle_logs(&service, cli.limit)
    } else if cli.stats {
        handle_stats(&service)
    } else {
        handle_daemon(&service).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("image_mirror=info,warn"),
            1 => EnvFilter::new("image_mirror=debug,info"),
            2 => EnvFilter::new("image_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Image Mirror Dry Run ===\n");

    println!("Remote:");
    println!("  Base URL: {}", config.remote.base_url);
    println!("  Listing path: {}", config.remote.listing_path);
    println!("  User agent: {}", config.remote.user_agent);

    println!("\nCrawler:");
    println!("  Default limit: {}", config.crawler.default_limit);
    println!("  Full sync limit: {}", config.crawler.full_sync_limit);
    println!("  Interval: {} minutes", config.crawler.interval_minutes);
    println!(
        "  Max concurrent downloads: {}",
        config.crawler.max_concurrent_downloads
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Image root: {}", config.storage.image_root);

    println!("\n✓ Configuration is valid");
}

/// Handles --once: runs a single crawl and prints its run log
async fn handle_once(service: &MirrorService, limit: Option<u32>) -> anyhow::Result<()> {
    let log = service.run_crawl(limit).await.context("Crawl failed")?;
    println!("Crawl finished:");
    print_run_log(&log);
    Ok(())
}

/// Handles --search: prints matching images
fn handle_search(service: &MirrorService, query: &str, limit: Option<u32>) -> anyhow::Result<()> {
    let limit = limit.map(u64::from).unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = service.search(query, limit).context("Search failed")?;
    println!("Results for \"{}\" ({}):", query, results.len());
    print_images(&results);
    Ok(())
}

/// Handles --logs: prints the most recent run logs
fn handle_logs(service: &MirrorService, limit: Option<u32>) -> anyhow::Result<()> {
    let limit = limit.map(u64::from).unwrap_or(20);
    let logs = service
        .list_run_logs(0, limit)
        .context("Failed to list run logs")?;

    println!("=== Crawl Runs ===\n");
    if logs.is_empty() {
        println!("No crawl runs recorded");
    }
    for log in &logs {
        print_run_log(log);
    }
    Ok(())
}

/// Handles --stats: prints catalog statistics
fn handle_stats(service: &MirrorService) -> anyhow::Result<()> {
    let stats = {
        let catalog = lock_catalog(service.catalog())?;
        load_statistics(&*catalog)?
    };
    print_statistics(&stats);
    Ok(())
}

/// Handles the default mode: run the scheduler until Ctrl-C
async fn handle_daemon(service: &MirrorService) -> anyhow::Result<()> {
    let scheduler = service
        .start_scheduler()
        .context("Failed to start scheduler")?;

    tracing::info!("Running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    scheduler.shutdown().await;
    Ok(())
}
