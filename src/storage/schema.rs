//! Database schema definitions
//!
//! This module contains the SQL schema for the story store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per ingested raw document
CREATE TABLE IF NOT EXISTS stories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT UNIQUE,
    title TEXT,
    author TEXT,
    excerpt TEXT,
    genre TEXT,
    reading_time TEXT,
    created_at TEXT,
    word_count INTEGER,
    content TEXT,
    source_file TEXT UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_slug ON stories(slug);
CREATE INDEX IF NOT EXISTS idx_source_file ON stories(source_file);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
