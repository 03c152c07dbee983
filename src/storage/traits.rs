//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::StoredStory;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A unique constraint rejected the row
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("No free slug found for '{0}'")]
    SlugExhausted(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for story store implementations
///
/// The read side of the store. Rows are only ever added through a
/// `StoryBatch`, never updated or deleted.
pub trait Storage {
    // ===== Membership =====

    /// Whether a row already exists for this raw document
    fn has_source(&self, source_file: &str) -> StorageResult<bool>;

    // ===== Queries =====

    /// Every stored story, in insertion order
    fn all_stories(&self) -> StorageResult<Vec<StoredStory>>;

    // ===== Statistics =====

    fn count_stories(&self) -> StorageResult<u64>;

    /// Story count per genre, largest first
    fn genre_counts(&self) -> StorageResult<Vec<(String, u64)>>;
}
