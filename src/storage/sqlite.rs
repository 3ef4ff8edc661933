//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CatalogStore, InsertOutcome, StorageError, StorageResult};
use crate::storage::{CrawlRunLog, ImageRecord, NewImage, RunStatus};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const IMAGE_COLUMNS: &str = "id, remote_id, title, view_count, download_count, thumbnail_url,
     local_path, filename, duration, image_type, mtime, created_at";

/// Lookup by remote id; the `remote_id <> 0` term lets SQLite use the partial unique index
const FIND_BY_REMOTE_ID_SQL: &str = "SELECT id, remote_id, title, view_count, download_count,
     thumbnail_url, local_path, filename, duration, image_type, mtime, created_at
     FROM images WHERE remote_id = ?1 AND remote_id <> 0";

const RUN_LOG_COLUMNS: &str =
    "id, status, images_found, images_downloaded, error_message, created_at";

/// SQLite catalog backend
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Opens or creates the catalog database at `path`
    ///
    /// The parent directory is created if missing.
    pub fn new(path: &Path) -> Result<Self, StorageError> {
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

    /// Creates an in-memory catalog (for testing)
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn map_image_row(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        title: row.get(2)?,
        view_count: row.get(3)?,
        download_count: row.get(4)?,
        thumbnail_url: row.get(5)?,
        local_path: row.get(6)?,
        filename: row.get(7)?,
        duration_label: row.get(8)?,
        image_type: row.get(9)?,
        mtime: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_run_log_row(row: &Row<'_>) -> rusqlite::Result<CrawlRunLog> {
    Ok(CrawlRunLog {
        id: row.get(0)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(1)?)
            .unwrap_or(RunStatus::Failed),
        images_found: row.get(2)?,
        images_downloaded: row.get(3)?,
        error_message: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Builds a `LIKE` pattern matching `token` anywhere, with wildcards escaped
fn like_pattern(token: &str) -> String {
    let mut pattern = String::with_capacity(token.len() + 2);
    pattern.push('%');
    for c in token.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_remote_id_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            failure.code == ErrorCode::ConstraintViolation
                && message
                    .as_deref()
                    .map_or(true, |m| m.contains("remote_id"))
        }
        _ => false,
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl CatalogStore for SqliteCatalog {
    // ===== Images =====

    fn find_by_remote_id(&self, remote_id: i64) -> StorageResult<Option<ImageRecord>> {
        let image = self
            .conn
            .query_row(FIND_BY_REMOTE_ID_SQL, params![remote_id], map_image_row)
            .optional()?;
        Ok(image)
    }

    fn insert_image(&mut self, image: &NewImage) -> StorageResult<InsertOutcome> {
        let result = self.conn.execute(
            "INSERT INTO images (remote_id, title, view_count, download_count, thumbnail_url,
             local_path, filename, duration, image_type, mtime, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                image.remote_id,
                image.title,
                image.view_count,
                image.download_count,
                image.thumbnail_url,
                image.local_path,
                image.filename,
                image.duration_label,
                image.image_type,
                image.mtime,
                image.created_at,
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                Ok(InsertOutcome::Inserted(image.clone().into_record(id)))
            }
            Err(e) if is_remote_id_conflict(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    fn get_image(&self, id: i64) -> StorageResult<Option<ImageRecord>> {
        let image = self
            .conn
            .query_row(
                &format!("SELECT {} FROM images WHERE id = ?1", IMAGE_COLUMNS),
                params![id],
                map_image_row,
            )
            .optional()?;
        Ok(image)
    }

    fn delete_image(&mut self, id: i64) -> StorageResult<Option<ImageRecord>> {
        let existing = self.get_image(id)?;
        if existing.is_some() {
            self.conn
                .execute("DELETE FROM images WHERE id = ?1", params![id])?;
        }
        Ok(existing)
    }

    fn count_images(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn list_images(&self, offset: u64, limit: u64) -> StorageResult<Vec<ImageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM images ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            IMAGE_COLUMNS
        ))?;

        let images = stmt
            .query_map(
                params![to_sql_int(limit), to_sql_int(offset)],
                map_image_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }

    fn query_by_title_substring_any(
        &self,
        tokens: &[String],
        limit: u64,
    ) -> StorageResult<Vec<ImageRecord>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let predicate = tokens
            .iter()
            .enumerate()
            .map(|(i, _)| format!("title LIKE ?{} ESCAPE '\\'", i + 1))
            .collect::<Vec<_>>()
            .join(" OR ");

        let sql = format!(
            "SELECT {} FROM images WHERE {} ORDER BY created_at DESC, id DESC LIMIT ?{}",
            IMAGE_COLUMNS,
            predicate,
            tokens.len() + 1
        );

        let mut values: Vec<Value> = tokens
            .iter()
            .map(|t| Value::Text(like_pattern(t)))
            .collect();
        values.push(Value::Integer(to_sql_int(limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let images = stmt
            .query_map(params_from_iter(values.iter()), map_image_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }

    // ===== Run Logs =====

    fn insert_run_log(&mut self, log: &CrawlRunLog) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_logs (status, images_found, images_downloaded, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.status.to_db_string(),
                log.images_found,
                log.images_downloaded,
                log.error_message,
                log.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_run_log(&mut self, log: &CrawlRunLog) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_logs SET status = ?1, images_found = ?2, images_downloaded = ?3,
             error_message = ?4 WHERE id = ?5",
            params![
                log.status.to_db_string(),
                log.images_found,
                log.images_downloaded,
                log.error_message,
                log.id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(log.id));
        }
        Ok(())
    }

    fn get_run_log(&self, id: i64) -> StorageResult<CrawlRunLog> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_logs WHERE id = ?1", RUN_LOG_COLUMNS),
                params![id],
                map_run_log_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(id))
    }

    fn list_run_logs(&self, offset: u64, limit: u64) -> StorageResult<Vec<CrawlRunLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_logs ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            RUN_LOG_COLUMNS
        ))?;

        let logs = stmt
            .query_map(
                params![to_sql_int(limit), to_sql_int(offset)],
                map_run_log_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    fn count_run_logs_by_status(&self, status: RunStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_logs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
