//! Record extraction from raw story documents
//!
//! This module turns one fetched page into an `ExtractedRecord`:
//! - Presentation markup is stripped from the content region
//! - Absolute links to the site are rewritten to root-relative ones
//! - The cleaned region is converted to Markdown
//! - Identity and text fields are resolved through fallback chains
//! - Word count and reading time are computed from the region text

mod metadata;
mod resolve;

pub use metadata::{ArticleMetadata, PageFacts};
pub use resolve::{identity_from_url, resolve_identity, Identity, DEFAULT_AUTHOR, UNCATEGORIZED};

use crate::config::ExtractConfig;
use crate::{ConfigError, ConfigResult};
use chrono::{DateTime, Utc};
use metadata::FactSelectors;
use scraper::{ElementRef, Html, Selector};

/// Elements removed from the content region before conversion
pub const PRESENTATION_ELEMENTS: &str = "div, script, br";

/// Words per minute used for the reading-time label
pub const WORDS_PER_MINUTE: usize = 200;

/// Structured record extracted from one raw document
///
/// Produced fresh on every ingestion pass and never stored as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    /// Raw document filename the record came from
    pub source_file: String,

    /// Slug before uniqueness is enforced
    pub slug: String,

    pub genre_slug: String,
    pub genre_name: String,
    pub title: String,
    pub author: String,
    pub excerpt: String,

    /// Label such as `"3 min"`
    pub reading_time: String,

    /// Publication timestamp as found in the page, or the extraction time
    pub created_at: String,

    pub word_count: usize,

    /// Markdown body
    pub body: String,
}

/// Extracts records using the configured content region and site host
#[derive(Debug, Clone)]
pub struct Extractor {
    content: Selector,
    presentation: Selector,
    canonical_host: String,
    facts: FactSelectors,
}

impl Extractor {
    /// Builds an extractor from the extraction settings
    ///
    /// # Arguments
    ///
    /// * `config` - Content selector and canonical host
    ///
    /// # Returns
    ///
    /// * `Ok(Extractor)` - Ready to extract
    /// * `Err(ConfigError)` - A selector failed to parse
    pub fn new(config: &ExtractConfig) -> ConfigResult<Self> {
        let content = Selector::parse(&config.content_selector).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid content selector '{}': {}",
                config.content_selector, e
            ))
        })?;
        let presentation = Selector::parse(PRESENTATION_ELEMENTS)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(Self {
            content,
            presentation,
            canonical_host: config.canonical_host.clone(),
            facts: FactSelectors::new().map_err(ConfigError::Validation)?,
        })
    }

    /// Extracts a record, stamping missing dates with the current time
    pub fn extract(&self, html: &str, filename: &str) -> Option<ExtractedRecord> {
        self.extract_at(html, filename, Utc::now())
    }

    /// Extracts a record from one document
    ///
    /// # Arguments
    ///
    /// * `html` - The raw document markup
    /// * `filename` - The raw document filename (source identifier)
    /// * `now` - Timestamp used when the page carries no publication date
    ///
    /// # Returns
    ///
    /// * `Some(ExtractedRecord)` - The document has a non-empty content region
    /// * `None` - No content region was found
    pub fn extract_at(
        &self,
        html: &str,
        filename: &str,
        now: DateTime<Utc>,
    ) -> Option<ExtractedRecord> {
        let mut document = Html::parse_document(html);

        let region_id = document.select(&self.content).next()?.id();
        let removable: Vec<_> = document
            .tree
            .get(region_id)
            .and_then(ElementRef::wrap)?
            .select(&self.presentation)
            .map(|element| element.id())
            .filter(|id| *id != region_id)
            .collect();
        for id in removable {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        let region = document.tree.get(region_id).and_then(ElementRef::wrap)?;
        let inner = region.inner_html();
        if inner.trim().is_empty() {
            return None;
        }

        let markup = inner.replace(&self.canonical_host, "/");
        let body = html2md::parse_html(markup.trim());

        let plain_text = region.text().collect::<String>();
        let word_count = count_words(&plain_text);

        let facts = self.facts.collect(&document, filename);
        let identity = resolve::resolve_identity(&facts);

        Some(ExtractedRecord {
            source_file: filename.to_string(),
            title: resolve::resolve_title(&facts, &identity.slug),
            author: resolve::resolve_author(&facts),
            excerpt: resolve::resolve_excerpt(&facts),
            created_at: resolve::resolve_created_at(&facts, now),
            genre_name: slug_to_title(&identity.genre),
            reading_time: reading_time(word_count),
            word_count,
            body,
            slug: identity.slug,
            genre_slug: identity.genre,
        })
    }
}

/// Counts whitespace-delimited tokens
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Formats a reading-time label, rounding minutes up
///
/// # Examples
///
/// ```
/// use story_pipeline::extract::reading_time;
///
/// assert_eq!(reading_time(0), "0 min");
/// assert_eq!(reading_time(201), "2 min");
/// ```
pub fn reading_time(word_count: usize) -> String {
    format!("{} min", word_count.div_ceil(WORDS_PER_MINUTE))
}

/// Turns a genre slug into a display name (`"true-love"` → `"True Love"`)
pub fn slug_to_title(slug: &str) -> String {
    if slug.is_empty() {
        return "Unknown".to_string();
    }

    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
