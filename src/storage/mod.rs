//! Storage module for ingested stories
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Source-file and slug membership checks
//! - Batched, transactional insertion
//! - Deterministic unique-slug resolution
//! - Read access for export and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteStorage, StoryBatch};
pub use traits::{Storage, StorageError, StorageResult};

use crate::extract::ExtractedRecord;
use crate::PipelineError;
use std::path::Path;

/// Slug used when a candidate is empty after truncation
pub const FALLBACK_SLUG: &str = "story";

/// Upper bound on numbered suffixes tried for one candidate slug
pub const MAX_SLUG_ATTEMPTS: usize = 10_000;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(PipelineError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, PipelineError> {
    SqliteStorage::new(path)
}

/// A story as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStory {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub excerpt: String,
    pub genre: Option<String>,
    pub reading_time: String,
    pub created_at: String,
    pub word_count: i64,
    pub content: String,
    pub source_file: String,
}

/// A story ready to insert, with its final unique slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub excerpt: String,
    pub genre: String,
    pub reading_time: String,
    pub created_at: String,
    pub word_count: i64,
    pub content: String,
    pub source_file: String,
}

impl NewStory {
    /// Builds the row for an extracted record under a resolved slug
    pub fn from_record(record: &ExtractedRecord, slug: String) -> Self {
        Self {
            slug,
            title: record.title.clone(),
            author: record.author.clone(),
            excerpt: record.excerpt.clone(),
            genre: record.genre_slug.clone(),
            reading_time: record.reading_time.clone(),
            created_at: record.created_at.clone(),
            word_count: i64::try_from(record.word_count).unwrap_or(i64::MAX),
            content: record.body.clone(),
            source_file: record.source_file.clone(),
        }
    }
}

/// Caps a slug at `max_len` characters and strips trailing hyphens
///
/// # Examples
///
/// ```
/// use story_pipeline::storage::truncate_slug;
///
/// assert_eq!(truncate_slug("a-long-slug", 7), "a-long");
/// assert_eq!(truncate_slug("short", 150), "short");
/// ```
pub fn truncate_slug(candidate: &str, max_len: usize) -> String {
    let capped: String = candidate.chars().take(max_len).collect();
    capped.trim_end_matches('-').to_string()
}

/// Finds the first free slug for a candidate
///
/// The truncated candidate is used as-is when free; otherwise `-1`, `-2`,
/// ... are appended, shortening the base so the result stays within
/// `max_len`. The same candidate against the same taken set always yields
/// the same slug.
///
/// # Arguments
///
/// * `candidate` - Proposed slug
/// * `max_len` - Maximum slug length in characters
/// * `exists` - Membership check against the store
///
/// # Returns
///
/// * `Ok(String)` - A slug for which `exists` returned false
/// * `Err(StorageError)` - The check failed or no suffix was free
pub fn resolve_unique_slug<F>(candidate: &str, max_len: usize, mut exists: F) -> StorageResult<String>
where
    F: FnMut(&str) -> StorageResult<bool>,
{
    let mut base = truncate_slug(candidate, max_len);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }

    if !exists(&base)? {
        return Ok(base);
    }

    for counter in 1..=MAX_SLUG_ATTEMPTS {
        let suffix = format!("-{counter}");
        let stem = truncate_slug(&base, max_len.saturating_sub(suffix.len()));
        let slug = format!("{stem}{suffix}");
        if !exists(&slug)? {
            return Ok(slug);
        }
    }

    Err(StorageError::SlugExhausted(base))
}
