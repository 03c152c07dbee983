//! Output module for the export stage and store reports
//!
//! This module handles:
//! - Ordering and paginating stored stories
//! - Writing the `latest`, `genres` and `stories` JSON trees
//! - Loading and printing store statistics

mod export;
pub mod stats;

pub use export::{
    export_feed, order_stories, parse_created_at, ExportReport, IndexEntry, OrderedStory,
    StoryDocument, GENRES_DIR, LATEST_DIR, STORIES_DIR,
};
pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::config::Config;
use crate::storage::open_storage;
use crate::PipelineError;
use chrono::Utc;
use std::path::Path;

/// Runs the export stage against the configured store and output directory
///
/// "Now" is captured once, so every unparsable timestamp in this run
/// resolves to the same instant.
///
/// # Arguments
///
/// * `config` - The pipeline configuration
///
/// # Returns
///
/// * `Ok(ExportReport)` - Export tree regenerated
/// * `Err(PipelineError)` - Reading the store or writing output failed
pub fn run_export(config: &Config) -> Result<ExportReport, PipelineError> {
    let storage = open_storage(Path::new(&config.paths.database))?;
    export_feed(
        &storage,
        Path::new(&config.paths.out_dir),
        config.export.page_size,
        Utc::now(),
    )
}
