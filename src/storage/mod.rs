//! Storage module for the image catalog
//!
//! This module handles all database operations for the mirror, including:
//! - SQLite database initialization and schema management
//! - Image record persistence with remote-id uniqueness
//! - Crawl run log bookkeeping
//! - Title search queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCatalog;
pub use traits::{CatalogStore, InsertOutcome, StorageError, StorageResult};

use chrono::{SecondsFormat, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Catalog handle shared between concurrent download tasks
pub type SharedCatalog = Arc<Mutex<SqliteCatalog>>;

/// Wraps a catalog for sharing across tasks
pub fn share(catalog: SqliteCatalog) -> SharedCatalog {
    Arc::new(Mutex::new(catalog))
}

/// Locks a shared catalog, surfacing poisoning as a storage error
pub fn lock_catalog(catalog: &SharedCatalog) -> StorageResult<MutexGuard<'_, SqliteCatalog>> {
    catalog.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Opens (or creates) the catalog database at `path`
pub fn open_catalog(path: &Path) -> Result<SqliteCatalog, StorageError> {
    SqliteCatalog::new(path)
}

/// Current time in the catalog's timestamp format
///
/// RFC 3339 UTC with fixed microsecond precision, so lexical order matches
/// chronological order in `ORDER BY created_at`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// An image stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: i64,
    /// Identity assigned by the remote source; 0 marks a manual upload
    pub remote_id: i64,
    pub title: String,
    pub view_count: i64,
    pub download_count: i64,
    /// Original remote reference, kept for provenance
    pub thumbnail_url: String,
    /// File name relative to the image root
    pub local_path: String,
    /// Original remote file name
    pub filename: String,
    pub duration_label: String,
    pub image_type: String,
    pub mtime: i64,
    pub created_at: String,
}

/// An image about to be inserted into the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub remote_id: i64,
    pub title: String,
    pub view_count: i64,
    pub download_count: i64,
    pub thumbnail_url: String,
    pub local_path: String,
    pub filename: String,
    pub duration_label: String,
    pub image_type: String,
    pub mtime: i64,
    pub created_at: String,
}

impl NewImage {
    /// Attaches the database id assigned on insert
    pub fn into_record(self, id: i64) -> ImageRecord {
        ImageRecord {
            id,
            remote_id: self.remote_id,
            title: self.title,
            view_count: self.view_count,
            download_count: self.download_count,
            thumbnail_url: self.thumbnail_url,
            local_path: self.local_path,
            filename: self.filename,
            duration_label: self.duration_label,
            image_type: self.image_type,
            mtime: self.mtime,
            created_at: self.created_at,
        }
    }
}

/// Audit record of one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRunLog {
    pub id: i64,
    pub status: RunStatus,
    pub images_found: u32,
    pub images_downloaded: u32,
    /// Present iff `status` is `Failed`
    pub error_message: Option<String>,
    pub created_at: String,
}

impl CrawlRunLog {
    /// A fresh log in the `running` state, not yet persisted (`id` is 0)
    pub fn start() -> Self {
        Self {
            id: 0,
            status: RunStatus::Running,
            images_found: 0,
            images_downloaded: 0,
            error_message: None,
            created_at: now_timestamp(),
        }
    }

    /// Moves a running log to `success` with the final counts
    ///
    /// Terminal logs are left untouched; returns whether the transition happened.
    pub fn finish_success(&mut self, found: u32, downloaded: u32) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RunStatus::Success;
        self.images_found = found;
        self.images_downloaded = downloaded;
        self.error_message = None;
        true
    }

    /// Moves a running log to `failed`, zeroing the counts
    pub fn finish_failed(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RunStatus::Failed;
        self.images_found = 0;
        self.images_downloaded = 0;
        self.error_message = Some(message.into());
        true
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}
