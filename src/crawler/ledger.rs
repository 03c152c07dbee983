//! Append-only fetch history and failure log
//!
//! Both files are newline-delimited and only ever appended to. Each append
//! is a single `write_all` of one complete line on a file opened in append
//! mode, so concurrent workers never interleave partial records.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Durable record of successfully fetched URLs
#[derive(Debug, Clone)]
pub struct FetchLedger {
    path: PathBuf,
}

impl FetchLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every recorded URL, creating an empty ledger if none exists
    pub fn load(&self) -> io::Result<HashSet<String>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Records a URL as fetched
    ///
    /// Callers must only do this after the raw document is on disk.
    pub async fn append(&self, url: &str) -> io::Result<()> {
        append_line(self.path.clone(), format!("{url}\n")).await
    }
}

/// Best-effort log of `url | message` failure records
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one failure record
    ///
    /// A write failure is logged and otherwise ignored.
    pub async fn record(&self, url: &str, message: &str) {
        let line = format!("{} | {}\n", url, message.replace('\n', " "));
        if let Err(e) = append_line(self.path.clone(), line).await {
            tracing::warn!(
                "Could not write to failure log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

async fn append_line(path: PathBuf, line: String) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()
    })
    .await
    .map_err(io::Error::other)?
}
