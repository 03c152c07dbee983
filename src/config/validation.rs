use crate::config::types::{Config, CrawlerConfig, ExportConfig, ExtractConfig, PathsConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_paths_config(&config.paths)?;
    validate_extract_config(&config.extract)?;
    validate_export_config(&config.export)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_worker_count(config.workers)?;

    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.challenge_title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "challenge_title cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.referer)
        .map_err(|e| ConfigError::Validation(format!("Invalid referer '{}': {}", config.referer, e)))?;

    Ok(())
}

/// Validates a worker count, whether it came from the file or the CLI
pub fn validate_worker_count(workers: usize) -> Result<(), ConfigError> {
    if !(1..=64).contains(&workers) {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            workers
        )));
    }
    Ok(())
}

/// Validates that no path is empty
fn validate_paths_config(config: &PathsConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("targets", &config.targets),
        ("ledger", &config.ledger),
        ("error_log", &config.error_log),
        ("raw_dir", &config.raw_dir),
        ("database", &config.database),
        ("out_dir", &config.out_dir),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }
    Ok(())
}

/// Validates extraction settings
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    let host = Url::parse(&config.canonical_host).map_err(|e| {
        ConfigError::Validation(format!(
            "Invalid canonical_host '{}': {}",
            config.canonical_host, e
        ))
    })?;

    if !config.canonical_host.ends_with('/') || host.path() != "/" {
        return Err(ConfigError::Validation(format!(
            "canonical_host must be a bare origin ending in '/', got '{}'",
            config.canonical_host
        )));
    }

    Selector::parse(&config.content_selector).map_err(|e| {
        ConfigError::Validation(format!(
            "Invalid content_selector '{}': {:?}",
            config.content_selector, e
        ))
    })?;

    // Room for at least one character plus a "-N" suffix
    if config.max_slug_length < 8 {
        return Err(ConfigError::Validation(format!(
            "max_slug_length must be >= 8, got {}",
            config.max_slug_length
        )));
    }

    Ok(())
}

/// Validates export settings
fn validate_export_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page_size must be >= 1".to_string(),
        ));
    }
    Ok(())
}
