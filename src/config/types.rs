use serde::Deserialize;

/// Main configuration structure for Image Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote gallery API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote gallery (e.g., "https://www.pighub.top")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the listing endpoint, joined onto `base_url`
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page size for scheduled and manual crawls
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: u32,

    /// Page size for the one-off startup crawl when the catalog is empty
    #[serde(rename = "full-sync-limit", default = "default_full_sync_limit")]
    pub full_sync_limit: u32,

    /// Minutes between scheduled crawls
    #[serde(rename = "interval-minutes", default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Maximum number of downloads in flight within one run
    #[serde(
        rename = "max-concurrent-downloads",
        default = "default_max_concurrent_downloads"
    )]
    pub max_concurrent_downloads: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite catalog database
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Directory downloaded images are written to
    #[serde(rename = "image-root", default = "default_image_root")]
    pub image_root: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            full_sync_limit: default_full_sync_limit(),
            interval_minutes: default_interval_minutes(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            image_root: default_image_root(),
        }
    }
}

impl Config {
    /// Creates a configuration with default crawler and storage sections
    pub fn new(remote: RemoteConfig) -> Self {
        Self {
            remote,
            crawler: CrawlerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RemoteConfig {
    /// Creates a remote configuration with default path and user agent
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            listing_path: default_listing_path(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_listing_path() -> String {
    "/api/images".to_string()
}

fn default_user_agent() -> String {
    format!("image-mirror/{}", env!("CARGO_PKG_VERSION"))
}

fn default_limit() -> u32 {
    20
}

fn default_full_sync_limit() -> u32 {
    1000
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_max_concurrent_downloads() -> u32 {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    "data/catalog.db".to_string()
}

fn default_image_root() -> String {
    "data/images".to_string()
}
