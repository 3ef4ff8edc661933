//! Image Mirror: a remote gallery ingestion pipeline
//!
//! This crate mirrors images from a remote gallery API into local storage and a
//! SQLite catalog. It crawls the remote listing on a schedule or on demand,
//! downloads new items concurrently with remote-id deduplication, keeps an audit
//! log of every crawl run, and offers keyword search over catalog titles.

pub mod config;
pub mod crawler;
pub mod output;
pub mod remote;
pub mod search;
pub mod service;
pub mod storage;

use thiserror::Error;

/// Main error type for Image Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Remote API returned status {status}")]
    RemoteUnavailable { status: u16 },

    #[error("Asset fetch failed for {url}: status {status}")]
    AssetFetchFailed { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Failed to decode listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Image Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, DownloadOutcome, Scheduler, SkipReason};
pub use remote::{ListingEntry, RemoteClient};
pub use search::SearchIndex;
pub use service::MirrorService;
pub use storage::{CatalogStore, CrawlRunLog, ImageRecord, RunStatus, SqliteCatalog};
