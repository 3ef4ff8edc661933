//! Storage traits and error types
//!
//! This module defines the trait interface for catalog backends and
//! associated error types.

use crate::storage::{CrawlRunLog, ImageRecord, NewImage, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run log not found: {0}")]
    RunNotFound(i64),


    #[error("Catalog lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result of inserting an image record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written and assigned an id
    Inserted(ImageRecord),

    /// Another record with the same remote id already exists
    Duplicate,
}

/// Trait for catalog backend implementations
///
/// The store is the final arbiter of remote-id uniqueness: concurrent writers
/// may both pass `find_by_remote_id`, but only one `insert_image` succeeds.
pub trait CatalogStore {
    // ===== Images =====

    /// Looks up an image by its remote identifier
    ///
    /// Remote id 0 marks manual uploads and never matches.
    fn find_by_remote_id(&self, remote_id: i64) -> StorageResult<Option<ImageRecord>>;

    /// Inserts an image, reporting `Duplicate` on a remote-id conflict
    ///
    /// Records with `remote_id = 0` are manual uploads and never conflict.
    fn insert_image(&mut self, image: &NewImage) -> StorageResult<InsertOutcome>;

    /// Gets an image by catalog id
    fn get_image(&self, id: i64) -> StorageResult<Option<ImageRecord>>;

    /// Deletes an image, returning the removed record
    fn delete_image(&mut self, id: i64) -> StorageResult<Option<ImageRecord>>;

    /// Counts all images
    fn count_images(&self) -> StorageResult<u64>;

    /// Lists images, most recently ingested first
    fn list_images(&self, offset: u64, limit: u64) -> StorageResult<Vec<ImageRecord>>;

    /// Returns images whose title contains any of `tokens`, newest first
    fn query_by_title_substring_any(
        &self,
        tokens: &[String],
        limit: u64,
    ) -> StorageResult<Vec<ImageRecord>>;

    // ===== Run Logs =====

    /// Persists a new run log, returning its id
    fn insert_run_log(&mut self, log: &CrawlRunLog) -> StorageResult<i64>;

    /// Overwrites status, counts, and error of an existing run log
    fn update_run_log(&mut self, log: &CrawlRunLog) -> StorageResult<()>;

    /// Gets a run log by id
    fn get_run_log(&self, id: i64) -> StorageResult<CrawlRunLog>;

    /// Lists run logs, newest first
    fn list_run_logs(&self, offset: u64, limit: u64) -> StorageResult<Vec<CrawlRunLog>>;

    /// Counts run logs in the given status
    fn count_run_logs_by_status(&self, status: RunStatus) -> StorageResult<u64>;
}
