//! Fetch targets and their derived filenames
//!
//! A target is identified on disk by the lower-cased last segment of its URL
//! path, with exactly one `.html` suffix.

use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use std::path::Path;

/// Suffix every raw document filename carries
pub const RAW_SUFFIX: &str = ".html";

/// A URL scheduled for fetching in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTarget {
    /// The URL exactly as listed in the target file
    pub url: String,

    /// Raw document filename derived from the URL
    pub filename: String,
}

impl PendingTarget {
    /// Builds a target, or `None` if the URL has no usable path segment
    pub fn new(url: &str) -> Option<Self> {
        derive_filename(url).map(|filename| Self {
            url: url.to_string(),
            filename,
        })
    }
}

/// Derives the raw document filename for a URL
///
/// The query string and fragment are stripped, the last non-empty segment is
/// percent-decoded and lower-cased, and a single `.html` suffix is enforced
/// (so `story.html` and `story` both map to `story.html`). If decoding fails
/// the undecoded segment is used instead.
///
/// # Examples
///
/// ```
/// use story_pipeline::crawler::derive_filename;
///
/// assert_eq!(
///     derive_filename("https://example.com/comedy/My%20Story/?page=2"),
///     Some("my story.html".to_string())
/// );
/// assert_eq!(
///     derive_filename("https://example.com/a/story.HTML"),
///     Some("story.html".to_string())
/// );
/// ```
pub fn derive_filename(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    let segment = without_query.split('/').filter(|s| !s.is_empty()).last()?;

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
        .to_lowercase()
        .replace(['/', '\\'], "_");

    let stem = decoded.strip_suffix(RAW_SUFFIX).unwrap_or(&decoded);
    if stem.is_empty() {
        return None;
    }

    Some(format!("{stem}{RAW_SUFFIX}"))
}

/// Reads a newline-delimited target list
///
/// Blank lines are ignored and repeated URLs are kept only once, in order
/// of first appearance. An unreadable list is a configuration error.
pub fn load_targets(path: &Path) -> ConfigResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::TargetList {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_target_list(&content))
}

fn parse_target_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}
