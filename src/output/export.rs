//! Paginated JSON export of the story store
//!
//! The export is purely derived from the store. Each run wipes the
//! `latest`, `genres` and `stories` subtrees and writes them again, so
//! repeated runs over an unchanged store produce identical files.

use crate::storage::{Storage, StoredStory};
use crate::PipelineError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Namespace of the global newest-first index
pub const LATEST_DIR: &str = "latest";

/// Namespace of the per-genre indexes
pub const GENRES_DIR: &str = "genres";

/// Namespace of the full story documents
pub const STORIES_DIR: &str = "stories";

const PAGES_DIR: &str = "pages";

/// Lightweight listing entry used in index pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    pub link: String,
    pub author: String,
    #[serde(rename = "authorLink")]
    pub author_link: Option<String>,
    pub description: String,
    pub rating: String,
    pub reads: u64,
    pub posted: String,
    pub posted_iso: String,
    pub tags: Vec<Option<String>>,
}

impl IndexEntry {
    /// Builds the entry for a story posted at `posted`
    pub fn new(story: &StoredStory, posted: DateTime<Utc>) -> Self {
        let author = if story.author.is_empty() {
            "Anonymous".to_string()
        } else {
            story.author.clone()
        };

        Self {
            id: story.slug.clone(),
            title: story.title.clone(),
            link: format!("/story/{}", story.slug),
            author,
            author_link: None,
            description: story.excerpt.clone(),
            rating: "N/A".to_string(),
            reads: 0,
            posted: posted.format("%a %b %d %Y").to_string(),
            posted_iso: posted.to_rfc3339_opts(SecondsFormat::Millis, true),
            tags: vec![story.genre.clone()],
        }
    }
}

/// Full story document: the index entry plus the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryDocument {
    #[serde(flatten)]
    pub entry: IndexEntry,
    pub content: String,
}

/// Counts of what one export run wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Story documents written
    pub stories: usize,

    pub latest_pages: usize,
    pub genres: usize,
    pub genre_pages: usize,
}

impl ExportReport {
    /// Prints the run summary to stdout
    pub fn print_summary(&self) {
        println!("=== Export Summary ===");
        println!("  Stories: {}", self.stories);
        println!("  Latest pages: {}", self.latest_pages);
        println!("  Genres: {}", self.genres);
        println!("  Genre pages: {}", self.genre_pages);
    }
}

/// Parses a stored creation timestamp
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both
/// with optional fractional seconds, taken as UTC) and a bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A story paired with the instant it sorts and displays at
#[derive(Debug, Clone, Copy)]
pub struct OrderedStory<'a> {
    pub story: &'a StoredStory,
    pub posted: DateTime<Utc>,
}

impl OrderedStory<'_> {
    pub fn entry(&self) -> IndexEntry {
        IndexEntry::new(self.story, self.posted)
    }
}

/// Orders stories newest first, ties broken by descending row id
///
/// Unparsable timestamps are treated as `now` without touching the stored
/// value.
pub fn order_stories(stories: &[StoredStory], now: DateTime<Utc>) -> Vec<OrderedStory<'_>> {
    let mut ordered: Vec<OrderedStory<'_>> = stories
        .iter()
        .map(|story| OrderedStory {
            story,
            posted: parse_created_at(&story.created_at).unwrap_or(now),
        })
        .collect();

    ordered.sort_by(|a, b| {
        b.posted
            .cmp(&a.posted)
            .then_with(|| b.story.id.cmp(&a.story.id))
    });
    ordered
}

/// Exports the whole store
///
/// # Arguments
///
/// * `storage` - The story store
/// * `out_dir` - Root of the export tree
/// * `page_size` - Entries per index page
/// * `now` - Instant substituted for unparsable timestamps
///
/// # Returns
///
/// * `Ok(ExportReport)` - Everything was written
/// * `Err(PipelineError)` - Reading the store or writing a file failed
pub fn export_feed(
    storage: &dyn Storage,
    out_dir: &Path,
    page_size: usize,
    now: DateTime<Utc>,
) -> Result<ExportReport, PipelineError> {
    let page_size = page_size.max(1);
    let stories = storage.all_stories()?;
    let ordered = order_stories(&stories, now);

    for namespace in [LATEST_DIR, GENRES_DIR, STORIES_DIR] {
        reset_dir(&out_dir.join(namespace))?;
    }

    let mut report = ExportReport::default();

    tracing::info!("Generating latest index for {} stories", ordered.len());
    let stories_dir = out_dir.join(STORIES_DIR);
    for item in &ordered {
        if !is_safe_component(&item.story.slug) {
            tracing::warn!(
                "Skipping story document for unsafe slug {:?} (id {})",
                item.story.slug,
                item.story.id
            );
            continue;
        }
        let document = StoryDocument {
            entry: item.entry(),
            content: item.story.content.clone(),
        };
        write_json(
            &stories_dir.join(format!("{}.json", item.story.slug)),
            &document,
        )?;
        report.stories += 1;
    }

    let latest: Vec<&OrderedStory<'_>> = ordered.iter().collect();
    report.latest_pages = write_pages(&out_dir.join(LATEST_DIR), &latest, page_size)?;
    tracing::info!("Saved {} pages to {}/", report.latest_pages, LATEST_DIR);

    for (genre, members) in group_by_genre(&ordered) {
        if !is_safe_component(genre) {
            tracing::warn!("Skipping genre with unsafe name {:?}", genre);
            continue;
        }
        let pages = write_pages(&out_dir.join(GENRES_DIR).join(genre), &members, page_size)?;
        tracing::debug!("Saved {}/{}/ ({} pages)", GENRES_DIR, genre, pages);
        report.genres += 1;
        report.genre_pages += pages;
    }

    tracing::info!(
        "Export complete: {} stories, {} genres",
        report.stories,
        report.genres
    );
    Ok(report)
}

/// Groups ordered stories by non-empty genre, keeping their order
fn group_by_genre<'s, 'a>(
    ordered: &'s [OrderedStory<'a>],
) -> BTreeMap<&'a str, Vec<&'s OrderedStory<'a>>> {
    let mut groups: BTreeMap<&'a str, Vec<&'s OrderedStory<'a>>> = BTreeMap::new();
    for item in ordered {
        let story: &'a StoredStory = item.story;
        if let Some(genre) = story.genre.as_deref().filter(|g| !g.is_empty()) {
            groups.entry(genre).or_default().push(item);
        }
    }
    groups
}

/// Writes `<base>/pages/<n>.json` for each page, numbered from 1
fn write_pages(
    base: &Path,
    items: &[&OrderedStory<'_>],
    page_size: usize,
) -> Result<usize, PipelineError> {
    let pages_dir = base.join(PAGES_DIR);
    std::fs::create_dir_all(&pages_dir)?;

    let mut written = 0;
    for (index, chunk) in items.chunks(page_size).enumerate() {
        let entries: Vec<IndexEntry> = chunk.iter().map(|item| item.entry()).collect();
        write_json(&page_path(&pages_dir, index + 1), &entries)?;
        written += 1;
    }
    Ok(written)
}

fn page_path(pages_dir: &Path, page: usize) -> PathBuf {
    pages_dir.join(format!("{page}.json"))
}

/// Pretty-printed with a trailing newline
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}

fn reset_dir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(dir)
}

/// Whether a value can be used as a single path component
fn is_safe_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
