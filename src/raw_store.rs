//! Raw document store
//!
//! One file per fetched target, named by its derived filename. Writes go to a
//! temporary sibling and are renamed into place, so a crash never leaves a
//! half-written document under its final name.

use crate::crawler::RAW_SUFFIX;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Every filename currently in the store (any extension)
    pub fn existing_filenames(&self) -> io::Result<HashSet<String>> {
        match std::fs::read_dir(&self.dir) {
            Ok(entries) => {
                let mut names = HashSet::new();
                for entry in entries {
                    let entry = entry?;
                    if let Some(name) = entry.file_name().to_str() {
                        names.insert(name.to_string());
                    }
                }
                Ok(names)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(e),
        }
    }

    /// Raw document filenames, sorted so processing order is deterministic
    pub fn documents(&self) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = self
            .existing_filenames()?
            .into_iter()
            .filter(|name| name.ends_with(RAW_SUFFIX))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Reads a document, replacing invalid UTF-8 sequences
    pub fn read(&self, filename: &str) -> io::Result<String> {
        let bytes = std::fs::read(self.path_of(filename))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Durably writes a document, replacing any previous version
    pub fn write(&self, filename: &str, markup: &str) -> io::Result<()> {
        self.ensure_dir()?;
        let final_path = self.path_of(filename);
        let tmp_path = self.path_of(&format!("{filename}.part"));

        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(markup.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &final_path)
    }
}
