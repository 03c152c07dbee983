//! Ingestion of raw documents into the story store
//!
//! Every raw document without a stored row is extracted and inserted once,
//! inside a single transaction per run. A document that fails is logged
//! and counted; it never aborts its siblings.

use crate::config::Config;
use crate::extract::Extractor;
use crate::raw_store::RawStore;
use crate::storage::{open_storage, NewStory, SqliteStorage, Storage, StorageResult, StoryBatch};
use crate::PipelineError;
use std::path::Path;

/// Outcome counts of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Raw documents found
    pub total: usize,

    /// Documents that already have a stored row
    pub already_done: usize,

    pub pending: usize,
    pub inserted: usize,

    /// Documents without a content region
    pub skipped_no_content: usize,

    /// Unreadable documents and rejected rows
    pub failed: usize,
}

impl IngestReport {
    /// Prints the run summary to stdout
    pub fn print_summary(&self) {
        println!("=== Ingest Summary ===");
        println!("  Raw documents: {}", self.total);
        println!("  Already in store: {}", self.already_done);
        println!("  Pending: {}", self.pending);
        println!("  Inserted: {}", self.inserted);
        println!("  Skipped (no content): {}", self.skipped_no_content);
        println!("  Failed: {}", self.failed);
    }
}

enum Outcome {
    Inserted,
    NoContent,
}

/// Runs the ingestion stage against the configured paths
pub fn run_ingest(config: &Config) -> Result<IngestReport, PipelineError> {
    let extractor = Extractor::new(&config.extract)?;
    let raw_store = RawStore::new(&config.paths.raw_dir);
    let mut storage = open_storage(Path::new(&config.paths.database))?;

    ingest(
        &mut storage,
        &raw_store,
        &extractor,
        config.extract.max_slug_length,
    )
}

/// Ingests every raw document not yet represented in the store
///
/// # Arguments
///
/// * `storage` - The story store
/// * `raw_store` - Where the crawl stage left the raw documents
/// * `extractor` - Record extractor
/// * `max_slug_len` - Slug length cap in characters
///
/// # Returns
///
/// * `Ok(IngestReport)` - The batch committed; individual documents may have failed
/// * `Err(PipelineError)` - The raw store or the transaction itself failed
pub fn ingest(
    storage: &mut SqliteStorage,
    raw_store: &RawStore,
    extractor: &Extractor,
    max_slug_len: usize,
) -> Result<IngestReport, PipelineError> {
    raw_store.ensure_dir()?;
    let documents = raw_store.documents()?;

    let mut pending = Vec::new();
    for filename in &documents {
        if !storage.has_source(filename)? {
            pending.push(filename.as_str());
        }
    }

    let mut report = IngestReport {
        total: documents.len(),
        already_done: documents.len() - pending.len(),
        pending: pending.len(),
        ..Default::default()
    };

    tracing::info!(
        "Found {} raw documents. {} already in store. {} pending.",
        report.total,
        report.already_done,
        report.pending
    );

    if pending.is_empty() {
        tracing::info!("Store is up to date, nothing to ingest");
        return Ok(report);
    }

    let batch = storage.begin_batch()?;
    for filename in pending {
        match ingest_document(&batch, raw_store, extractor, max_slug_len, filename) {
            Ok(Outcome::Inserted) => report.inserted += 1,
            Ok(Outcome::NoContent) => {
                tracing::error!("No content found in {}", filename);
                report.skipped_no_content += 1;
            }
            Err(e) => {
                tracing::error!("Failed to ingest {}: {}", filename, e);
                report.failed += 1;
            }
        }
    }
    batch.commit()?;

    tracing::info!("Ingested {} new stories", report.inserted);
    Ok(report)
}

fn ingest_document(
    batch: &StoryBatch<'_>,
    raw_store: &RawStore,
    extractor: &Extractor,
    max_slug_len: usize,
    filename: &str,
) -> StorageResult<Outcome> {
    let html = raw_store.read(filename)?;
    let Some(record) = extractor.extract(&html, filename) else {
        return Ok(Outcome::NoContent);
    };

    let slug = batch.unique_slug(&record.slug, max_slug_len)?;
    batch.insert(&NewStory::from_record(&record, slug.clone()))?;
    tracing::info!("Inserted: {}", slug);
    Ok(Outcome::Inserted)
}
