use serde::Deserialize;

/// Main configuration structure for the pipeline
///
/// Every section has defaults, so an absent or partial config file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub paths: PathsConfig,
    pub extract: ExtractConfig,
    pub export: ExportConfig,
}

/// Crawl stage behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Pause between consecutive targets of one worker (milliseconds)
    pub request_delay_ms: u64,

    /// Upper bound on a single navigation (seconds)
    pub navigation_timeout_secs: u64,

    /// Grace interval before re-checking a bot challenge (seconds)
    pub challenge_wait_secs: u64,

    /// Page title that marks a bot-challenge interstitial
    pub challenge_title: String,

    pub accept_language: String,
    pub referer: String,
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            request_delay_ms: 2000,
            navigation_timeout_secs: 45,
            challenge_wait_secs: 6,
            challenge_title: "Just a moment...".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: "https://www.antarvasna3.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// File and directory locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Newline-delimited list of URLs to fetch
    pub targets: String,

    /// Append-only log of successfully fetched URLs
    pub ledger: String,

    /// Append-only `url | message` failure log
    pub error_log: String,

    /// Directory of fetched raw documents
    pub raw_dir: String,

    /// SQLite database file
    pub database: String,

    /// Root of the exported feed
    pub out_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            targets: "urls.txt".to_string(),
            ledger: "urls_history.log".to_string(),
            error_log: "phase0_errors.log".to_string(),
            raw_dir: "raw_html".to_string(),
            database: "scraped_data.db".to_string(),
            out_dir: "out".to_string(),
        }
    }
}

/// Record extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractConfig {
    /// Absolute site prefix rewritten to `/` inside story bodies
    pub canonical_host: String,

    /// CSS selector of the story content region
    pub content_selector: String,

    /// Maximum length of a stored slug (characters)
    pub max_slug_length: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            canonical_host: "https://www.antarvasna3.com/".to_string(),
            content_selector: "section.story-content".to_string(),
            max_slug_length: 150,
        }
    }
}

/// Export stage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExportConfig {
    /// Stories per index page
    pub page_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { page_size: 70 }
    }
}
