//! Story Pipeline main entry point
//!
//! This is the command-line interface for the crawl → ingest → export
//! story pipeline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use story_pipeline::config::{load_config_with_hash, validate, Config};
use story_pipeline::crawler::{crawl, CrawlOptions};
use story_pipeline::ingest::run_ingest;
use story_pipeline::output::{load_statistics, print_statistics, run_export};
use story_pipeline::storage::open_storage;
use tracing_subscriber::EnvFilter;

/// Story Pipeline: an idempotent story fetcher and feed exporter
///
/// Fetches story pages into a raw document store, ingests them into
/// SQLite exactly once, and exports a paginated JSON feed. Every stage
/// can be interrupted and re-run safely.
#[derive(Parser, Debug)]
#[command(name = "story-pipeline")]
#[command(version = "1.0.0")]
#[command(about = "An idempotent story fetch, ingest and export pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
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
    /// Run crawl, ingest and export in sequence
    Run(CrawlArgs),

    /// Fetch pending URLs into the raw document store
    Crawl {
        #[command(flatten)]
        args: CrawlArgs,

        /// Show what would be fetched without fetching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract raw documents into the story store
    Ingest,

    /// Regenerate the JSON feed from the story store
    Export,

    /// Show statistics from the story store and exit
    Stats,
}

#[derive(Args, Debug, Clone)]
struct CrawlArgs {
    /// Re-fetch every URL, ignoring history and existing raw documents
    #[arg(long)]
    force: bool,

    /// Alternate target list
    #[arg(long, value_name = "PATH")]
    urls: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
}

impl CrawlArgs {
    fn to_options(&self, config: &Config, dry_run: bool) -> CrawlOptions {
        let mut options = CrawlOptions::from_config(config);
        options.force = self.force;
        options.dry_run = dry_run;
        if let Some(urls) = &self.urls {
            options.target_list_path = urls.clone();
        }
        if let Some(workers) = self.workers {
            options.worker_count = workers;
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => handle_run(&config, &args).await,
        Command::Crawl { args, dry_run } => {
            let report = crawl(&config, args.to_options(&config, dry_run))
                .await
                .context("Crawl stage failed")?;
            report.print_summary();
            Ok(())
        }
        Command::Ingest => {
            let report = run_ingest(&config).context("Ingest stage failed")?;
            report.print_summary();
            Ok(())
        }
        Command::Export => {
            let report = run_export(&config).context("Export stage failed")?;
            report.print_summary();
            Ok(())
        }
        Command::Stats => handle_stats(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("story_pipeline=info,warn"),
            1 => EnvFilter::new("story_pipeline=debug,info"),
            2 => EnvFilter::new("story_pipeline=trace,debug"),
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

/// Loads the config file if one was given, otherwise validated defaults
fn load_configuration(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        let config = Config::default();
        validate(&config).context("Default configuration is invalid")?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Handles the `run` command: every stage in order, halting on the first
/// stage that cannot run
async fn handle_run(config: &Config, args: &CrawlArgs) -> Result<()> {
    if !args.force && args.urls.is_none() && args.workers.is_none() {
        tracing::info!("Running full pipeline");
    } else {
        tracing::info!("Running full pipeline with crawl overrides: {:?}", args);
    }

    tracing::info!("[1/3] Crawl");
    let crawl_report = crawl(config, args.to_options(config, false))
        .await
        .context("Pipeline halted in crawl stage")?;
    crawl_report.print_summary();

    tracing::info!("[2/3] Ingest");
    let ingest_report = run_ingest(config).context("Pipeline halted in ingest stage")?;
    ingest_report.print_summary();

    tracing::info!("[3/3] Export");
    let export_report = run_export(config).context("Pipeline halted in export stage")?;
    export_report.print_summary();

    tracing::info!("All stages completed");
    Ok(())
}

/// Handles the `stats` command: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.paths.database);

    let storage = open_storage(Path::new(&config.paths.database))
        .context("Failed to open story store")?;
    let stats = load_statistics(&storage).context("Failed to load statistics")?;

    print_statistics(&stats);
    Ok(())
}
