use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_core::{Config, ConfigError, ConfigOptions, SitemapView, writer_for};
use sitemapper_scanner::{CrawlReport, Crawler, HttpFetcher, ProgressCallback};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Exit status for bad command line configuration.
pub const EXIT_CONFIG_ERROR: u8 = 2;
/// Exit status for any other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Install the fmt subscriber. `RUST_LOG` wins over the verbose flag.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be set when running under a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Map parsed arguments onto raw config options.
pub fn options_from_matches(matches: &ArgMatches) -> ConfigOptions {
    let target = matches
        .get_one::<String>("URL")
        .cloned()
        .unwrap_or_default();

    let mut options = ConfigOptions::new(target);
    options.filename = matches.get_one::<String>("filename").cloned();
    if let Some(map_type) = matches.get_one::<String>("map-type") {
        options.map_type = map_type.clone();
    }
    if let Some(format) = matches.get_one::<String>("format") {
        options.format = format.clone();
    }
    options.verbose = matches.get_flag("verbose");
    options.parallel = matches.get_flag("parallel");
    options.workers = matches.get_one::<usize>("workers").copied();
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    options.deadline_secs = matches.get_one::<u64>("deadline").copied();
    options.keep_evicted = matches.get_flag("keep-evicted");
    options
}

/// Exit status for an error returned by `handle_crawl`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub async fn handle_crawl(matches: &ArgMatches) -> Result<()> {
    let options = options_from_matches(matches);
    init_tracing(options.verbose);

    let config = Config::new(options)?;
    let quiet = matches.get_flag("quiet");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, writing partial sitemap");
            ctrl_c.cancel();
        }
    });

    let report = run_crawl(&config, cancel, quiet).await?;
    let path = write_output(&config, &report)?;

    if !quiet {
        print_summary(&config, &report, &path);
    }
    Ok(())
}

/// Run one crawl as configured. Per-page failures end up in the report.
pub async fn run_crawl(
    config: &Config,
    cancel: CancellationToken,
    quiet: bool,
) -> Result<CrawlReport> {
    let fetcher = HttpFetcher::with_timeout(config.timeout.as_secs())
        .context("Failed to build HTTP client")?;

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Crawling {}", config.target));

    let spinner_clone = spinner.clone();
    let progress_callback: ProgressCallback = Arc::new(move |done: usize, url: String| {
        spinner_clone.set_message(format!("{} pages: {}", done, display_path(&url)));
    });

    let mut crawler = Crawler::with_fetcher(fetcher)
        .with_concurrency_limit(config.concurrency)
        .with_eviction_policy(config.eviction)
        .with_verbose(config.verbose)
        .with_cancellation_token(cancel)
        .with_progress_callback(progress_callback);
    if let Some(deadline) = config.deadline {
        crawler = crawler.with_deadline(deadline);
    }

    let report = crawler.crawl(config.target.clone()).await;
    spinner.finish_and_clear();

    info!(
        "Crawled {} pages, {} failures, {} evicted",
        report.total_pages(),
        report.failures.len(),
        report.evicted.len()
    );
    Ok(report)
}

/// Project the report into the configured view and write it out.
pub fn write_output(config: &Config, report: &CrawlReport) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(&config.filename);
    let path = PathBuf::from(expanded.as_ref());

    let view = SitemapView::build(&report.site, config.map_type);
    writer_for(config.format)
        .write_to(&view, &path)
        .with_context(|| format!("Failed to write sitemap to {}", path.display()))?;

    Ok(path)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn print_summary(config: &Config, report: &CrawlReport, path: &std::path::Path) {
    println!();
    print_divider();
    if report.is_complete() {
        println!("{}", "✓ Crawl complete".green().bold());
    } else {
        println!("{}", "⚠ Crawl stopped early, sitemap is partial".yellow().bold());
    }
    print_divider();

    println!("  {:<16} {}", "Target:".bright_white(), config.target);
    println!(
        "  {:<16} {}",
        "Pages found:".bright_white(),
        report.total_pages().to_string().cyan()
    );
    println!("  {:<16} {}", "Pages fetched:".bright_white(), report.pages_fetched);
    println!("  {:<16} {}", "Non-HTML:".bright_white(), report.evicted.len());
    println!(
        "  {:<16} {}",
        "Failures:".bright_white(),
        if report.failures.is_empty() {
            "0".green()
        } else {
            report.failures.len().to_string().red()
        }
    );
    println!("  {:<16} {:.2?}", "Duration:".bright_white(), report.duration);
    println!(
        "  {:<16} {} ({}, {})",
        "Output:".bright_white(),
        path.display(),
        config.map_type,
        config.format
    );

    if config.verbose && !report.failures.is_empty() {
        println!("\n{}", "Failed pages:".red().bold());
        for failure in &report.failures {
            println!("  {} {}  {}", "✗".red(), display_path(&failure.url), failure.error.dimmed());
        }
    }
    println!();
}

/// Path part of a URL for compact display, `/` for the root.
pub fn display_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| u.path().to_string())
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| url.to_string())
}
