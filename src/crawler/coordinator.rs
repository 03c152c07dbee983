//! Crawl coordinator - pending-set computation and the worker pool
//!
//! This module contains the crawl run logic, including:
//! - Loading the target list, fetch ledger, and existing raw documents
//! - Deciding which targets still need fetching
//! - Splitting them into contiguous chunks, one per worker
//! - Running the workers concurrently, each strictly sequential
//! - Recording successes in the ledger and failures in the failure log

use crate::config::{validate_worker_count, Config, CrawlerConfig};
use crate::crawler::fetcher::{fetch_page, Browser, FetchPolicy, SessionSettings};
use crate::crawler::ledger::{FailureLog, FetchLedger};
use crate::crawler::target::{load_targets, PendingTarget};
use crate::raw_store::RawStore;
use crate::{FetchError, FetchResult, PipelineError};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Per-run crawl options, usually taken from the command line
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Ignore the ledger and existing raw documents
    pub force: bool,

    /// Newline-delimited list of URLs to fetch
    pub target_list_path: PathBuf,

    /// Number of concurrent workers
    pub worker_count: usize,

    /// Compute and report the pending set without fetching anything
    pub dry_run: bool,
}

impl CrawlOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            force: false,
            target_list_path: PathBuf::from(&config.paths.targets),
            worker_count: config.crawler.workers,
            dry_run: false,
        }
    }
}

/// Outcome counts of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Distinct URLs in the target list
    pub total: usize,

    /// Skipped because already in the ledger or on disk
    pub already_done: usize,

    /// Scheduled for fetching
    pub pending: usize,

    pub succeeded: usize,
    pub failed: usize,
}

impl CrawlReport {
    /// Prints the run summary to stdout
    pub fn print_summary(&self) {
        println!("=== Crawl Summary ===");
        println!("  Total targets: {}", self.total);
        println!("  Already done: {}", self.already_done);
        println!("  Pending: {}", self.pending);
        println!("  Fetched: {}", self.succeeded);
        println!("  Failed: {}", self.failed);
    }
}

/// Result of filtering the target list
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    /// Targets to fetch, in target-list order
    pub targets: Vec<PendingTarget>,

    /// URLs no filename can be derived from
    pub unnamed: Vec<String>,

    /// Targets whose filename an earlier pending target already claimed,
    /// paired with that earlier URL
    pub duplicates: Vec<(PendingTarget, String)>,

    pub already_done: usize,
}

impl PendingSet {
    /// Targets rejected before any worker starts
    pub fn rejected(&self) -> usize {
        self.unnamed.len() + self.duplicates.len()
    }
}

/// Decides which targets still need fetching
///
/// Without `force`, a target is skipped if its URL is in the ledger OR its
/// derived filename already exists in the raw store. The second check
/// covers documents that reached disk without a ledger entry.
///
/// Each filename is claimed by the first pending target deriving it; later
/// targets deriving the same name are set aside as duplicates so no two
/// workers ever write the same raw document.
pub fn compute_pending(
    targets: &[String],
    ledger: &HashSet<String>,
    existing_files: &HashSet<String>,
    force: bool,
) -> PendingSet {
    let mut set = PendingSet::default();
    let mut claimed: HashMap<String, String> = HashMap::new();

    for url in targets {
        let target = PendingTarget::new(url);

        if !force {
            let on_disk = target
                .as_ref()
                .is_some_and(|t| existing_files.contains(&t.filename));
            if ledger.contains(url) || on_disk {
                set.already_done += 1;
                continue;
            }
        }

        match target {
            Some(target) => match claimed.get(&target.filename) {
                Some(owner) => set.duplicates.push((target, owner.clone())),
                None => {
                    claimed.insert(target.filename.clone(), target.url.clone());
                    set.targets.push(target);
                }
            },
            None => set.unnamed.push(url.clone()),
        }
    }

    set
}

/// Splits items into `workers` contiguous chunks of near-equal size
///
/// Chunk `i` holds `items[i * size .. (i + 1) * size]` with
/// `size = ceil(len / workers)`; trailing chunks may be empty.
pub fn partition<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let size = items.len().div_ceil(workers).max(1);
    (0..workers)
        .map(|i| {
            let start = (i * size).min(items.len());
            let end = ((i + 1) * size).min(items.len());
            items[start..end].to_vec()
        })
        .collect()
}

/// Shared, read-only state handed to every worker
struct CrawlContext {
    browser: Arc<dyn Browser>,
    settings: SessionSettings,
    policy: FetchPolicy,
    request_delay: Duration,
    raw_store: RawStore,
    ledger: FetchLedger,
    failures: FailureLog,
}

#[derive(Debug, Default)]
struct WorkerTally {
    succeeded: usize,
    failed: usize,
}

/// Main crawl coordinator
pub struct Coordinator {
    context: Arc<CrawlContext>,
    options: CrawlOptions,
}

impl Coordinator {
    /// Creates a coordinator for one crawl run
    ///
    /// # Arguments
    ///
    /// * `config` - The pipeline configuration (paths and crawler settings)
    /// * `options` - Per-run options (force, target list, worker count)
    /// * `browser` - The page-fetching backend
    pub fn new(config: &Config, options: CrawlOptions, browser: Arc<dyn Browser>) -> Self {
        let context = CrawlContext {
            browser,
            settings: SessionSettings::from_config(&config.crawler),
            policy: FetchPolicy::from_config(&config.crawler),
            request_delay: request_delay(&config.crawler),
            raw_store: RawStore::new(&config.paths.raw_dir),
            ledger: FetchLedger::new(&config.paths.ledger),
            failures: FailureLog::new(&config.paths.error_log),
        };

        Self {
            context: Arc::new(context),
            options,
        }
    }

    /// Runs the crawl
    ///
    /// Reading the target list, ledger, or raw directory is the only thing
    /// that can fail the run, and it fails before any worker starts. Every
    /// per-target failure is logged, recorded, and counted instead.
    pub async fn run(&self) -> Result<CrawlReport, PipelineError> {
        validate_worker_count(self.options.worker_count)?;
        let targets = load_targets(&self.options.target_list_path)?;
        self.context.raw_store.ensure_dir()?;
        let ledger = self.context.ledger.load()?;
        let existing = self.context.raw_store.existing_filenames()?;

        if self.options.force {
            tracing::warn!("Force mode: ignoring fetch history and existing raw documents");
        }

        let pending = compute_pending(&targets, &ledger, &existing, self.options.force);

        let mut report = CrawlReport {
            total: targets.len(),
            already_done: pending.already_done,
            pending: pending.targets.len(),
            ..Default::default()
        };

        tracing::info!(
            "Found {} total URLs. {} already done/exist. {} pending.",
            report.total,
            report.already_done,
            report.pending
        );

        if self.options.dry_run {
            for target in &pending.targets {
                println!("  would fetch {} -> {}", target.url, target.filename);
            }
            for url in &pending.unnamed {
                println!("  cannot name {}", url);
            }
            for (target, owner) in &pending.duplicates {
                println!("  duplicate {} -> {} (claimed by {})", target.url, target.filename, owner);
            }
            return Ok(report);
        }

        for url in &pending.unnamed {
            let error = FetchError::UnnamedTarget(url.clone());
            tracing::error!("Skipping {}: {}", url, error);
            self.context.failures.record(url, &error.to_string()).await;
            report.failed += 1;
        }

        for (target, owner) in &pending.duplicates {
            let error = FetchError::DuplicateFilename {
                filename: target.filename.clone(),
                claimed_by: owner.clone(),
            };
            tracing::error!("Skipping {}: {}", target.url, error);
            self.context.failures.record(&target.url, &error.to_string()).await;
            report.failed += 1;
        }

        if pending.targets.is_empty() {
            tracing::info!("All URLs processed!");
            return Ok(report);
        }

        let chunks = partition(&pending.targets, self.options.worker_count);
        tracing::info!("Starting crawl with {} workers", chunks.len());

        let mut workers = JoinSet::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            if chunk.is_empty() {
                continue;
            }
            let context = Arc::clone(&self.context);
            workers.spawn(process_chunk(index + 1, chunk, context));
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => {
                    report.succeeded += tally.succeeded;
                    report.failed += tally.failed;
                }
                Err(e) => tracing::error!("Worker task aborted: {}", e),
            }
        }

        // Anything a panicked worker never reached is still unfetched
        let accounted = report.succeeded + report.failed - pending.rejected();
        report.failed += report.pending.saturating_sub(accounted);

        tracing::info!(
            "Crawl batch complete: {} fetched, {} failed",
            report.succeeded,
            report.failed
        );

        Ok(report)
    }
}

/// Runs one crawl with the given browser backend
///
/// # Arguments
///
/// * `config` - The pipeline configuration
/// * `options` - Per-run options
/// * `browser` - The page-fetching backend
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Per-target outcome counts
/// * `Err(PipelineError)` - The run could not start
pub async fn run_crawl(
    config: &Config,
    options: CrawlOptions,
    browser: Arc<dyn Browser>,
) -> Result<CrawlReport, PipelineError> {
    Coordinator::new(config, options, browser).run().await
}

fn request_delay(config: &CrawlerConfig) -> Duration {
    Duration::from_millis(config.request_delay_ms)
}

/// Processes one chunk strictly in order, pausing between requests
async fn process_chunk(
    worker: usize,
    chunk: Vec<PendingTarget>,
    context: Arc<CrawlContext>,
) -> WorkerTally {
    let mut tally = WorkerTally::default();
    let last = chunk.len().saturating_sub(1);

    for (i, target) in chunk.iter().enumerate() {
        tracing::info!("[Worker {}] Crawling: {}", worker, target.url);

        match crawl_target(&context, target).await {
            Ok(()) => {
                tracing::info!("[Worker {}] Success: {}", worker, target.filename);
                tally.succeeded += 1;
            }
            Err(e) => {
                tracing::error!("[Worker {}] Error: {} | {}", worker, target.url, e);
                context.failures.record(&target.url, &e.to_string()).await;
                tally.failed += 1;
            }
        }

        if i < last && !context.request_delay.is_zero() {
            tokio::time::sleep(context.request_delay).await;
        }
    }

    tally
}

/// Fetches one target, persists it, then records it in the ledger
async fn crawl_target(context: &CrawlContext, target: &PendingTarget) -> FetchResult<()> {
    let markup = fetch_page(
        context.browser.as_ref(),
        &context.settings,
        &context.policy,
        &target.url,
    )
    .await?;

    let store = context.raw_store.clone();
    let filename = target.filename.clone();
    tokio::task::spawn_blocking(move || store.write(&filename, &markup))
        .await
        .map_err(std::io::Error::other)??;

    context.ledger.append(&target.url).await?;
    Ok(())
}
