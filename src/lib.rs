//! Story Pipeline: an idempotent fetch → extract → export pipeline
//!
//! This crate fetches story pages from a single site, extracts structured
//! records from them into SQLite, and exports a paginated JSON feed. Every
//! stage can be interrupted and re-run without duplicating work.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod ingest;
pub mod output;
pub mod raw_store;
pub mod storage;

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are fatal: they abort a stage before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to read target list {path}: {source}")]
    TargetList {
        path: String,
        source: std::io::Error,
    },
}

/// Per-target fetch failures
///
/// None of these abort a crawl; the target is logged and skipped, and stays
/// eligible for the next run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation timed out after {seconds}s")]
    NavigationTimeout { seconds: u64 },

    #[error("Bot challenge still present after waiting")]
    BotChallengeUnresolved,

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Refused to load blocked resource type '{0}'")]
    BlockedResource(String),

    #[error("Cannot derive a filename from {0}")]
    UnnamedTarget(String),

    #[error("Filename {filename} is already claimed by {claimed_by}")]
    DuplicateFilename { filename: String, claimed_by: String },

    #[error("Failed to persist raw document: {0}")]
    Persist(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for a single fetch
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOptions, CrawlReport};
pub use extract::ExtractedRecord;
pub use ingest::IngestReport;
pub use output::ExportReport;
pub use storage::{NewStory, SqliteStorage, Storage, StoredStory};
