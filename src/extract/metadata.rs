//! Page facts gathered once per document
//!
//! Everything the field resolvers look at is read out of the parsed
//! document up front, so each resolver is a pure function of `PageFacts`.

use scraper::{Html, Selector};
use serde_json::Value;

/// The schema.org type a metadata block must declare to be used
pub const ARTICLE_TYPE: &str = "Article";

/// Fields read from a JSON-LD article block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub canonical_url: Option<String>,
    pub headline: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub date_published: Option<String>,
}

impl ArticleMetadata {
    /// Reads an article block, or `None` if the value is not an `Article`
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("@type").and_then(Value::as_str) != Some(ARTICLE_TYPE) {
            return None;
        }

        Some(Self {
            canonical_url: canonical_url(value),
            headline: string_field(value, "headline"),
            author: author_name(value.get("author")),
            description: string_field(value, "description"),
            date_published: string_field(value, "datePublished"),
        })
    }
}

/// `mainEntityOfPage.@id`, a string `mainEntityOfPage`, or `url`
fn canonical_url(value: &Value) -> Option<String> {
    let main_entity = match value.get("mainEntityOfPage") {
        Some(Value::Object(entity)) => entity.get("@id").and_then(non_empty),
        Some(Value::String(id)) => non_empty_str(id),
        _ => None,
    };
    main_entity.or_else(|| string_field(value, "url"))
}

fn author_name(author: Option<&Value>) -> Option<String> {
    match author? {
        Value::Object(person) => person.get("name").and_then(non_empty),
        Value::String(name) => non_empty_str(name),
        Value::Array(people) => people.first().and_then(|first| author_name(Some(first))),
        _ => None,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(non_empty)
}

fn non_empty(value: &Value) -> Option<String> {
    value.as_str().and_then(non_empty_str)
}

/// Trims a string, treating whitespace-only as absent
pub(crate) fn non_empty_str(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Facts about one document that the resolvers choose from
#[derive(Debug, Clone, Default)]
pub struct PageFacts {
    /// Raw document filename, e.g. `my-story.html`
    pub filename: String,

    /// First JSON-LD block of article type
    pub article: Option<ArticleMetadata>,

    /// `href` of `<link rel="canonical">`
    pub canonical_link: Option<String>,

    /// Text of the first `<h1>`
    pub heading: Option<String>,

    /// `content` of `<meta name="author">`
    pub meta_author: Option<String>,

    /// `content` of `<meta name="description">`
    pub meta_description: Option<String>,

    /// `content` of `<meta property="article:published_time">`, else the
    /// `datetime` of the first `<time>`
    pub meta_published: Option<String>,
}

/// Selectors used to gather `PageFacts`
#[derive(Debug, Clone)]
pub(crate) struct FactSelectors {
    ld_json: Selector,
    canonical: Selector,
    heading: Selector,
    meta_author: Selector,
    meta_description: Selector,
    meta_published: Selector,
    time: Selector,
}

impl FactSelectors {
    pub(crate) fn new() -> Result<Self, String> {
        let parse = |css: &str| Selector::parse(css).map_err(|e| format!("{css}: {e}"));
        Ok(Self {
            ld_json: parse(r#"script[type="application/ld+json"]"#)?,
            canonical: parse(r#"link[rel="canonical"][href]"#)?,
            heading: parse("h1")?,
            meta_author: parse(r#"meta[name="author"]"#)?,
            meta_description: parse(r#"meta[name="description"]"#)?,
            meta_published: parse(r#"meta[property="article:published_time"]"#)?,
            time: parse("time[datetime]")?,
        })
    }

    /// Reads the page facts out of a parsed document
    pub(crate) fn collect(&self, document: &Html, filename: &str) -> PageFacts {
        PageFacts {
            filename: filename.to_string(),
            article: self.first_article(document),
            canonical_link: document
                .select(&self.canonical)
                .next()
                .and_then(|link| link.value().attr("href"))
                .and_then(non_empty_str),
            heading: document
                .select(&self.heading)
                .next()
                .and_then(|h1| non_empty_str(&h1.text().collect::<String>())),
            meta_author: meta_content(document, &self.meta_author),
            meta_description: meta_content(document, &self.meta_description),
            meta_published: meta_content(document, &self.meta_published).or_else(|| {
                document
                    .select(&self.time)
                    .next()
                    .and_then(|time| time.value().attr("datetime"))
                    .and_then(non_empty_str)
            }),
        }
    }

    /// Blocks that fail to parse are skipped
    fn first_article(&self, document: &Html) -> Option<ArticleMetadata> {
        document.select(&self.ld_json).find_map(|script| {
            let raw = script.text().collect::<String>();
            let value: Value = serde_json::from_str(&raw).ok()?;
            match &value {
                Value::Array(items) => items.iter().find_map(ArticleMetadata::from_value),
                other => ArticleMetadata::from_value(other),
            }
        })
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .and_then(non_empty_str)
}
