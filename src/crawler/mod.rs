//! Crawler module for the fetch stage
//!
//! This module contains the crawl logic, including:
//! - Target list loading and filename derivation
//! - The append-only fetch ledger and failure log
//! - Page fetching behind a browser abstraction
//! - Worker partitioning and overall crawl coordination

mod coordinator;
mod fetcher;
mod ledger;
mod target;

pub use coordinator::{
    compute_pending, partition, run_crawl, Coordinator, CrawlOptions, CrawlReport, PendingSet,
};
pub use fetcher::{
    document_title, fetch_page, resource_type, Browser, FetchPolicy, FetchSession, HttpBrowser,
    SessionSettings, BLOCKED_RESOURCE_TYPES,
};
pub use ledger::{FailureLog, FetchLedger};
pub use target::{derive_filename, load_targets, PendingTarget, RAW_SUFFIX};

use crate::config::Config;
use crate::PipelineError;
use std::sync::Arc;

/// Runs a complete crawl with the default HTTP browser
///
/// This is the main entry point for the fetch stage. It will:
/// 1. Load the target list, ledger, and existing raw documents
/// 2. Compute the pending set
/// 3. Partition it across the configured workers
/// 4. Fetch, persist, and record each target
///
/// # Arguments
///
/// * `config` - The pipeline configuration
/// * `options` - Per-run options (force, target list, workers, dry run)
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished; individual targets may have failed
/// * `Err(PipelineError)` - Crawl could not start
pub async fn crawl(config: &Config, options: CrawlOptions) -> Result<CrawlReport, PipelineError> {
    let browser = HttpBrowser::new(&config.crawler)?;
    run_crawl(config, options, Arc::new(browser)).await
}
