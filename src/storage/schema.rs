//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the catalog database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Mirrored images
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    view_count INTEGER NOT NULL DEFAULT 0,
    download_count INTEGER NOT NULL DEFAULT 0,
    thumbnail_url TEXT NOT NULL,
    local_path TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    duration TEXT NOT NULL,
    image_type TEXT NOT NULL,
    mtime INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Remote ids are unique, except 0 which marks manual uploads
CREATE UNIQUE INDEX IF NOT EXISTS idx_images_remote_id
    ON images(remote_id) WHERE remote_id <> 0;
CREATE INDEX IF NOT EXISTS idx_images_created_at ON images(created_at);

-- One row per crawl attempt
CREATE TABLE IF NOT EXISTS crawl_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL,
    images_found INTEGER NOT NULL DEFAULT 0,
    images_downloaded INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_logs_status ON crawl_logs(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
