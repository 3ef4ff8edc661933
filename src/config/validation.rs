use crate::config::types::{Config, CrawlerConfig, RemoteConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Longest allowed crawl interval: one week
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.listing_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "listing_path must start with '/', got '{}'",
            config.listing_path
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.default_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "default_limit must be >= 1, got {}",
            config.default_limit
        )));
    }

    if config.full_sync_limit < config.default_limit {
        return Err(ConfigError::Validation(format!(
            "full_sync_limit ({}) must be >= default_limit ({})",
            config.full_sync_limit, config.default_limit
        )));
    }

    if config.interval_minutes < 1 || config.interval_minutes > MAX_INTERVAL_MINUTES {
        return Err(ConfigError::Validation(format!(
            "interval_minutes must be between 1 and {}, got {}",
            MAX_INTERVAL_MINUTES, config.interval_minutes
        )));
    }

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_downloads must be between 1 and 256, got {}",
            config.max_concurrent_downloads
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.image_root.is_empty() {
        return Err(ConfigError::Validation(
            "image_root cannot be empty".to_string(),
        ));
    }

    Ok(())
}
