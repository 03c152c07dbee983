//! Configuration module for the pipeline
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; missing keys take the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use story_pipeline::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pipeline.toml")).unwrap();
//! println!("Raw documents live in: {}", config.paths.raw_dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ExportConfig, ExtractConfig, PathsConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_worker_count};
