//! Integration tests for ingestion and export
//!
//! Raw documents are written straight into the raw store, then the ingest
//! and export stages are run the way the CLI runs them.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use story_pipeline::config::Config;
use story_pipeline::ingest::run_ingest;
use story_pipeline::output::run_export;
use story_pipeline::raw_store::RawStore;
use story_pipeline::storage::{open_storage, Storage};
use tempfile::TempDir;

fn create_test_config(dir: &TempDir, page_size: usize) -> Config {
    let mut config = Config::default();
    let root = dir.path();
    config.paths.raw_dir = root.join("raw").display().to_string();
    config.paths.database = root.join("store.db").display().to_string();
    config.paths.out_dir = root.join("out").display().to_string();
    config.export.page_size = page_size;
    config
}

/// A story page carrying article metadata
fn story_page(genre: &str, slug: &str, date: &str, words: &str) -> String {
    format!(
        r#"<html><head>
        <title>{slug}</title>
        <script type="application/ld+json">{{
            "@type": "Article",
            "headline": "Title of {slug}",
            "author": {{"@type": "Person", "name": "Writer"}},
            "description": "About {slug}",
            "datePublished": "{date}",
            "mainEntityOfPage": {{"@type": "WebPage", "@id": "https://www.antarvasna3.com/{genre}/{slug}/"}}
        }}</script>
        </head><body>
        <h1>Heading</h1>
        <section class="story-content">
            <p>{words}</p>
            <div class="share">Share this</div>
            <p>Read <a href="https://www.antarvasna3.com/{genre}/">more</a></p>
        </section>
        </body></html>"#
    )
}

fn write_raw(config: &Config, filename: &str, html: &str) {
    RawStore::new(&config.paths.raw_dir)
        .write(filename, html)
        .unwrap();
}

/// Every file under `root`, keyed by relative path
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                files.insert(relative, std::fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn read_json(path: PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn page_ids(page: &Value) -> Vec<&str> {
    page.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect()
}

#[test]
fn test_ingest_then_export_twice_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 70);
    write_raw(&config, "a.html", &story_page("comedy", "alpha", "2024-01-03T00:00:00Z", "one two"));
    write_raw(&config, "b.html", &story_page("drama", "beta", "2024-01-02T00:00:00Z", "three"));
    write_raw(&config, "c.html", &story_page("comedy", "gamma", "2024-01-01T00:00:00Z", "four"));

    let first_ingest = run_ingest(&config).unwrap();
    assert_eq!(first_ingest.inserted, 3);
    run_export(&config).unwrap();
    let first = snapshot(Path::new(&config.paths.out_dir));

    let second_ingest = run_ingest(&config).unwrap();
    assert_eq!(second_ingest.inserted, 0);
    assert_eq!(second_ingest.already_done, 3);
    run_export(&config).unwrap();
    let second = snapshot(Path::new(&config.paths.out_dir));

    assert_eq!(first, second);
    assert!(first.contains_key(Path::new("latest/pages/1.json")));
    assert!(first.contains_key(Path::new("genres/comedy/pages/1.json")));
    assert!(first.contains_key(Path::new("genres/drama/pages/1.json")));
    assert!(first.contains_key(Path::new("stories/alpha.json")));
}

#[test]
fn test_export_orders_newest_first() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 70);
    write_raw(&config, "a.html", &story_page("comedy", "t3", "2024-01-01T00:00:00Z", "x"));
    write_raw(&config, "b.html", &story_page("comedy", "t1", "2024-03-01T00:00:00Z", "x"));
    write_raw(&config, "c.html", &story_page("comedy", "t2", "2024-02-01T00:00:00Z", "x"));
    write_raw(&config, "d.html", &story_page("drama", "undated", "sometime last week", "x"));

    run_ingest(&config).unwrap();
    run_export(&config).unwrap();

    let out = PathBuf::from(&config.paths.out_dir);
    let latest = read_json(out.join("latest/pages/1.json"));
    assert_eq!(page_ids(&latest), vec!["undated", "t1", "t2", "t3"]);

    let comedy = read_json(out.join("genres/comedy/pages/1.json"));
    assert_eq!(page_ids(&comedy), vec!["t1", "t2", "t3"]);

    let storage = open_storage(Path::new(&config.paths.database)).unwrap();
    let undated = storage
        .all_stories()
        .unwrap()
        .into_iter()
        .find(|s| s.slug == "undated")
        .unwrap();
    assert_eq!(undated.created_at, "sometime last week");
}

#[test]
fn test_pagination_boundary() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2);
    for (i, slug) in ["s1", "s2", "s3"].iter().enumerate() {
        let date = format!("2024-01-0{}T00:00:00Z", i + 1);
        write_raw(&config, &format!("{slug}.html"), &story_page("comedy", slug, &date, "x"));
    }

    run_ingest(&config).unwrap();
    let report = run_export(&config).unwrap();

    assert_eq!(report.stories, 3);
    assert_eq!(report.latest_pages, 2);
    assert_eq!(report.genres, 1);
    assert_eq!(report.genre_pages, 2);

    let out = PathBuf::from(&config.paths.out_dir);
    assert_eq!(page_ids(&read_json(out.join("latest/pages/1.json"))), vec!["s3", "s2"]);
    assert_eq!(page_ids(&read_json(out.join("latest/pages/2.json"))), vec!["s1"]);
    assert!(!out.join("latest/pages/3.json").exists());
}

#[test]
fn test_colliding_slugs_stay_unique_through_export() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 70);
    write_raw(&config, "first.html", &story_page("comedy", "foo", "2024-01-01T00:00:00Z", "a"));
    write_raw(&config, "second.html", &story_page("drama", "foo", "2024-01-02T00:00:00Z", "b"));

    run_ingest(&config).unwrap();
    run_export(&config).unwrap();

    let storage = open_storage(Path::new(&config.paths.database)).unwrap();
    let mut slugs: Vec<String> = storage
        .all_stories()
        .unwrap()
        .into_iter()
        .map(|s| s.slug)
        .collect();
    slugs.sort();
    assert_eq!(slugs, vec!["foo", "foo-1"]);

    let out = PathBuf::from(&config.paths.out_dir);
    assert!(out.join("stories/foo.json").exists());
    assert!(out.join("stories/foo-1.json").exists());
}

#[test]
fn test_story_document_content() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 70);
    write_raw(
        &config,
        "a.html",
        &story_page("true-love", "my-story", "2024-01-15T10:30:00Z", "hello world"),
    );

    run_ingest(&config).unwrap();
    run_export(&config).unwrap();

    let path = PathBuf::from(&config.paths.out_dir).join("stories/my-story.json");
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.ends_with("}\n"));

    let document: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document["id"], "my-story");
    assert_eq!(document["title"], "Title of my-story");
    assert_eq!(document["link"], "/story/my-story");
    assert_eq!(document["author"], "Writer");
    assert_eq!(document["authorLink"], Value::Null);
    assert_eq!(document["description"], "About my-story");
    assert_eq!(document["posted"], "Mon Jan 15 2024");
    assert_eq!(document["posted_iso"], "2024-01-15T10:30:00.000Z");
    assert_eq!(document["tags"], serde_json::json!(["true-love"]));

    let content = document["content"].as_str().unwrap();
    assert!(content.contains("hello world"));
    assert!(!content.contains("Share this"));
    assert!(content.contains("(/true-love/)"));
}

#[test]
fn test_export_removes_stale_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 70);
    let stale = PathBuf::from(&config.paths.out_dir).join("stories/removed.json");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "{}").unwrap();

    run_export(&config).unwrap();

    assert!(!stale.exists());
    assert!(PathBuf::from(&config.paths.out_dir).join("latest/pages").is_dir());
}
