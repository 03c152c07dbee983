//! Field resolution chains
//!
//! Each field is resolved by an ordered list of resolvers; the first one
//! that yields a value wins, and a hard-coded default applies when none
//! does. Every resolver is a plain function of the page facts, so the
//! policy can be tested one link at a time.

use crate::crawler::RAW_SUFFIX;
use crate::extract::metadata::PageFacts;
use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Genre slug used when a document's URL carries no category segment
pub const UNCATEGORIZED: &str = "uncategorized";

/// Author used when neither metadata nor markup names one
pub const DEFAULT_AUTHOR: &str = "ghost";

/// Public identity of a story before uniqueness is enforced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub slug: String,
    pub genre: String,
}

type IdentityResolver = fn(&PageFacts) -> Option<Identity>;
type TextResolver = fn(&PageFacts) -> Option<String>;

const IDENTITY_RESOLVERS: &[IdentityResolver] = &[identity_from_metadata, identity_from_canonical];

const TITLE_RESOLVERS: &[TextResolver] = &[metadata_headline, first_heading];
const AUTHOR_RESOLVERS: &[TextResolver] = &[metadata_author, meta_author];
const EXCERPT_RESOLVERS: &[TextResolver] = &[metadata_description, meta_description];
const DATE_RESOLVERS: &[TextResolver] = &[metadata_date, meta_published];

fn metadata_headline(facts: &PageFacts) -> Option<String> {
    facts.article.as_ref()?.headline.clone()
}

fn first_heading(facts: &PageFacts) -> Option<String> {
    facts.heading.clone()
}

fn metadata_author(facts: &PageFacts) -> Option<String> {
    facts.article.as_ref()?.author.clone()
}

fn meta_author(facts: &PageFacts) -> Option<String> {
    facts.meta_author.clone()
}

fn metadata_description(facts: &PageFacts) -> Option<String> {
    facts.article.as_ref()?.description.clone()
}

fn meta_description(facts: &PageFacts) -> Option<String> {
    facts.meta_description.clone()
}

fn metadata_date(facts: &PageFacts) -> Option<String> {
    facts.article.as_ref()?.date_published.clone()
}

fn meta_published(facts: &PageFacts) -> Option<String> {
    facts.meta_published.clone()
}

fn first_match<T>(resolvers: &[fn(&PageFacts) -> Option<T>], facts: &PageFacts) -> Option<T> {
    resolvers.iter().find_map(|resolve| resolve(facts))
}

/// Resolves slug and genre: article metadata, then the canonical link,
/// then the filename with the uncategorized genre
pub fn resolve_identity(facts: &PageFacts) -> Identity {
    first_match(IDENTITY_RESOLVERS, facts).unwrap_or_else(|| identity_from_filename(&facts.filename))
}

/// Headline, then first heading, then the slug
pub fn resolve_title(facts: &PageFacts, slug: &str) -> String {
    first_match(TITLE_RESOLVERS, facts).unwrap_or_else(|| slug.to_string())
}

pub fn resolve_author(facts: &PageFacts) -> String {
    first_match(AUTHOR_RESOLVERS, facts).unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
}

pub fn resolve_excerpt(facts: &PageFacts) -> String {
    first_match(EXCERPT_RESOLVERS, facts).unwrap_or_default()
}

/// Publication date from metadata, then markup, or `now` as an ISO-8601 instant with milliseconds
pub fn resolve_created_at(facts: &PageFacts, now: DateTime<Utc>) -> String {
    first_match(DATE_RESOLVERS, facts)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn identity_from_metadata(facts: &PageFacts) -> Option<Identity> {
    identity_from_url(facts.article.as_ref()?.canonical_url.as_deref()?)
}

fn identity_from_canonical(facts: &PageFacts) -> Option<Identity> {
    identity_from_url(facts.canonical_link.as_deref()?)
}

/// Reads `/<genre>/<slug>/` from an absolute URL
///
/// Only the last two non-empty path segments count. A single segment is
/// the slug with the uncategorized genre; no segments, or an unparsable
/// URL, yields `None`.
pub fn identity_from_url(raw: &str) -> Option<Identity> {
    let url = Url::parse(raw.trim()).ok()?;
    let segments: Vec<String> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .map(decode_segment)
        .collect();

    match segments.as_slice() {
        [] => None,
        [slug] => Some(Identity {
            slug: slug.clone(),
            genre: UNCATEGORIZED.to_string(),
        }),
        [.., genre, slug] => Some(Identity {
            slug: slug.clone(),
            genre: genre.clone(),
        }),
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn identity_from_filename(filename: &str) -> Identity {
    Identity {
        slug: filename.strip_suffix(RAW_SUFFIX).unwrap_or(filename).to_string(),
        genre: UNCATEGORIZED.to_string(),
    }
}
