//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait,
//! plus `StoryBatch`, the single transaction an ingestion run inserts into.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{resolve_unique_slug, NewStory, StoredStory};
use crate::PipelineError;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use std::path::Path;

const STORY_COLUMNS: &str = "id, slug, title, author, excerpt, genre, reading_time, \
                             created_at, word_count, content, source_file";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(PipelineError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, PipelineError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens the transaction that one ingestion run inserts into
    ///
    /// Dropping the batch without calling `commit` rolls everything back.
    pub fn begin_batch(&mut self) -> StorageResult<StoryBatch<'_>> {
        Ok(StoryBatch {
            tx: self.conn.transaction()?,
        })
    }
}

impl Storage for SqliteStorage {
    fn has_source(&self, source_file: &str) -> StorageResult<bool> {
        source_exists(&self.conn, source_file)
    }

    fn all_stories(&self) -> StorageResult<Vec<StoredStory>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {STORY_COLUMNS} FROM stories ORDER BY id"))?;

        let stories = stmt
            .query_map([], story_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stories)
    }

    fn count_stories(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn genre_counts(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT genre, COUNT(*) AS n FROM stories
             WHERE genre IS NOT NULL AND genre != ''
             GROUP BY genre ORDER BY n DESC, genre",
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}

/// One all-or-nothing ingestion transaction
///
/// A rejected insert only undoes that statement; rows inserted before and
/// after it still commit together.
pub struct StoryBatch<'conn> {
    tx: Transaction<'conn>,
}

impl StoryBatch<'_> {
    /// Whether a slug is taken, counting rows inserted earlier in this batch
    pub fn slug_exists(&self, slug: &str) -> StorageResult<bool> {
        slug_taken(&self.tx, slug)
    }

    /// Resolves a free slug against the store plus this batch
    ///
    /// # Arguments
    ///
    /// * `candidate` - The slug proposed by extraction
    /// * `max_len` - Maximum slug length in characters
    pub fn unique_slug(&self, candidate: &str, max_len: usize) -> StorageResult<String> {
        resolve_unique_slug(candidate, max_len, |slug| self.slug_exists(slug))
    }

    /// Inserts one story, returning its row id
    ///
    /// Fails with `ConstraintViolation` if the slug or source file is
    /// already present; the batch stays usable.
    pub fn insert(&self, story: &NewStory) -> StorageResult<i64> {
        insert(&self.tx, story)
    }

    pub fn commit(self) -> StorageResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn source_exists(conn: &Connection, source_file: &str) -> StorageResult<bool> {
    let found = conn
        .query_row(
            "SELECT id FROM stories WHERE source_file = ?1",
            params![source_file],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn slug_taken(conn: &Connection, slug: &str) -> StorageResult<bool> {
    let found = conn
        .query_row(
            "SELECT id FROM stories WHERE slug = ?1",
            params![slug],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert(conn: &Connection, story: &NewStory) -> StorageResult<i64> {
    conn.execute(
        "INSERT INTO stories (slug, title, author, excerpt, genre, reading_time,
                              created_at, word_count, content, source_file)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            story.slug,
            story.title,
            story.author,
            story.excerpt,
            story.genre,
            story.reading_time,
            story.created_at,
            story.word_count,
            story.content,
            story.source_file,
        ],
    )
    .map_err(classify_insert_error)?;

    Ok(conn.last_insert_rowid())
}

fn classify_insert_error(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(
                message.clone().unwrap_or_else(|| failure.to_string()),
            )
        }
        _ => StorageError::Sqlite(e),
    }
}

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<StoredStory> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };

    Ok(StoredStory {
        id: row.get(0)?,
        slug: text(1)?,
        title: text(2)?,
        author: text(3)?,
        excerpt: text(4)?,
        genre: row.get(5)?,
        reading_time: text(6)?,
        created_at: text(7)?,
        word_count: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
        content: text(9)?,
        source_file: text(10)?,
    })
}
