//! SiteLens main entry point
//!
//! This is the command-line interface for the SiteLens page analyzer.

use clap::Parser;
use sitelens::config::{self, Config, CrawlSettings};
use sitelens::output::{generate_summary, load_statistics, print_statistics, write_markdown_report};
use sitelens::state::JobStatus;
use sitelens::storage::{JobFilter, JobStore, SqliteJobStore};
use sitelens::{AdmitError, Orchestrator};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long to wait before retrying an admission refused for capacity
const ADMIT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// SiteLens: single-page crawler and HTML metadata extractor
///
/// Fetches each URL once, records its title, html version, heading counts,
/// internal and external links, login forms and a sample of broken links.
/// With no URLs, jobs left queued in the database are run instead.
#[derive(Parser, Debug)]
#[command(name = "sitelens")]
#[command(version)]
#[command(about = "Single-page crawler and HTML metadata extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to submit and crawl
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and URLs without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_report"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_report"])]
    stats: bool,

    /// Generate a markdown report from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_report: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let loaded = match config::load(&cli.config) {
        Ok(loaded) => {
            tracing::info!(
                "Configuration loaded successfully (fingerprint: {})",
                loaded.fingerprint
            );
            loaded
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    let config = &loaded.config;

    if cli.dry_run {
        handle_dry_run(config, &cli.urls)?;
    } else if cli.stats {
        handle_stats(config)?;
    } else if cli.export_report {
        handle_export_report(config, &loaded.fingerprint)?;
    } else {
        handle_crawl(config, loaded.settings.clone(), &cli.urls).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitelens=info,warn"),
            1 => EnvFilter::new("sitelens=debug,info"),
            2 => EnvFilter::new("sitelens=trace,debug"),
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

/// Handles the --dry-run mode: validates config and URLs
fn handle_dry_run(config: &Config, urls: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SiteLens Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent crawls: {}",
        config.crawler.max_concurrent_crawls
    );
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Broken link sample: {}", config.crawler.broken_link_sample);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Report: {}", config.storage.report_path);

    println!("\nURLs ({}):", urls.len());
    let mut valid = 0;
    for url in urls {
        match sitelens::url::parse_target_url(url) {
            Ok(_) => {
                valid += 1;
                println!("  ✓ {}", url);
            }
            Err(e) => println!("  ✗ {} ({})", url, e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} of {} URLs", valid, urls.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let store = SqliteJobStore::new(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-report mode: writes the markdown report
fn handle_export_report(config: &Config, config_fingerprint: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting Crawl Report ===\n");
    println!("Database: {}", config.storage.database_path);
    println!("Output: {}", config.storage.report_path);
    println!();

    let store = SqliteJobStore::new(Path::new(&config.storage.database_path))?;

    tracing::info!("Loading jobs from database...");
    let summary = generate_summary(&store, config_fingerprint)?;

    tracing::info!("Generating markdown report...");
    write_markdown_report(&summary, Path::new(&config.storage.report_path))?;

    println!("✓ Report exported to: {}", config.storage.report_path);

    Ok(())
}

/// Handles the main crawl operation
///
/// Each URL becomes a job that is admitted as soon as a slot is free.
async fn handle_crawl(
    config: &Config,
    settings: CrawlSettings,
    urls: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(Mutex::new(SqliteJobStore::new(Path::new(
        &config.storage.database_path,
    ))?));
    let orchestrator = Orchestrator::new(settings, Arc::clone(&store))?;

    let job_ids = if urls.is_empty() {
        let queued = lock(&store).list_jobs(&JobFilter::with_status(JobStatus::Queued))?;
        tracing::info!("No URLs given, resuming {} queued jobs", queued.len());
        queued.into_iter().rev().map(|job| job.id).collect()
    } else {
        let mut ids = Vec::with_capacity(urls.len());
        for url in urls {
            match orchestrator.submit(url) {
                Ok(job) => ids.push(job.id),
                Err(e) => tracing::warn!("Skipping {}: {}", url, e),
            }
        }
        ids
    };

    for job_id in &job_ids {
        loop {
            match orchestrator.admit(job_id) {
                Ok(()) => break,
                Err(AdmitError::CapacityExceeded { .. }) => {
                    tokio::time::sleep(ADMIT_RETRY_INTERVAL).await;
                }
                Err(e) => {
                    tracing::warn!("Not starting job {}: {}", job_id, e);
                    break;
                }
            }
        }
    }

    orchestrator.wait_idle().await;
    tracing::info!("All {} jobs finished", job_ids.len());

    let stats = load_statistics(&*lock(&store))?;
    print_statistics(&stats);

    Ok(())
}

fn lock(store: &Mutex<SqliteJobStore>) -> std::sync::MutexGuard<'_, SqliteJobStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
