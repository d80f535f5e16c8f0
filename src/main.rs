//! forum-sweep main entry point
//!
//! This is the command-line interface for the forum-sweep crawler.

use clap::Parser;
use forum_sweep::config::{load_config_with_hash, Config};
use forum_sweep::crawler::crawl;
use forum_sweep::output::{describe_status, print_run_report};
use forum_sweep::state::CheckpointStore;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// forum-sweep: a resumable crawler for paginated forums
///
/// forum-sweep walks the configured forum sections page by page, saves one
/// record per unseen thread to SQLite and checkpoints after every listing
/// page, so a run halted by a broken connection resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "forum-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable crawler for paginated forums", long_about = None)]
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

    /// Discard the resume checkpoint and start from the first section
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the record database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "forum_sweep=info,warn",
            1 => "forum_sweep=debug,info",
            2 => "forum_sweep=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== forum-sweep Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Source: {}", config.site.source);
    println!("  Record type: {}", config.site.record_type);

    println!("\nCrawler Configuration:");
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout_secs);
    println!(
        "  Proxy: {}",
        config.crawler.proxy.as_deref().unwrap_or("(none)")
    );
    let limits = config.crawler.limits();
    println!(
        "  Max pages per section: {}",
        limits
            .max_pages_per_job
            .map_or("unlimited".to_string(), |n| n.to_string())
    );
    println!(
        "  Max items per section: {}",
        limits
            .max_items_per_job
            .map_or("unlimited".to_string(), |n| n.to_string())
    );
    println!(
        "  Stop on page of known items: {}",
        !limits.keep_scanning_duplicates
    );

    if let Some(reachability) = &config.reachability {
        println!("\nReachability check: {}", reachability.url);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Report: {}", config.output.summary_path);

    let (resume_job, resume_page) = CheckpointStore::new(&config.output.checkpoint_path).load();

    println!("\nSections ({}):", config.sections.len());
    for section in &config.sections {
        let marker = match &resume_job {
            Some(job) if *job == section.identifier => format!(" <- resumes at page {}", resume_page),
            _ => String::new(),
        };
        println!("  - {} ({}){}", section.name, section.identifier, marker);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the record database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use forum_sweep::output::{load_statistics, print_statistics};
    use forum_sweep::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
///
/// Exits non-zero when the run halted, was interrupted or could not reach
/// the network.
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<ExitCode> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoint if present)");
    }

    let report = crawl(config, fresh).await?;
    print_run_report(&report);

    if report.is_success() {
        tracing::info!("Crawl completed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("Crawl {}", describe_status(&report.status));
        Ok(ExitCode::FAILURE)
    }
}
