//! HTTP client for the remote gallery API
//!
//! One `reqwest::Client` is shared by the listing request and every asset
//! download of a run, so all of them draw from the same connection pool.

use crate::config::RemoteConfig;
use crate::remote::listing::{resolve_asset_url, Listing, ListingResponse};
use crate::{MirrorError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed with reqwest's default policy.
pub fn build_http_client(config: &RemoteConfig, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the remote listing and asset endpoints
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: Url,
    listing_url: Url,
}

impl RemoteClient {
    /// Creates a client with its own connection pool
    pub fn new(config: &RemoteConfig, timeout: Duration) -> Result<Self> {
        let client = build_http_client(config, timeout)?;
        Self::with_client(client, config)
    }

    /// Creates a client around an existing `reqwest::Client`
    pub fn with_client(client: Client, config: &RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let listing_url = base_url.join(&config.listing_path)?;
        Ok(Self {
            client,
            base_url,
            listing_url,
        })
    }

    /// URL of the listing request for a given page size
    pub fn listing_url(&self, limit: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("sort", "latest");
        url
    }

    /// Fetches one page of the remote listing, newest first
    ///
    /// # Errors
    ///
    /// * `MirrorError::RemoteUnavailable` - the endpoint answered with a non-success status
    /// * `MirrorError::Http` - the request itself failed
    /// * `MirrorError::Decode` - the body is not a listing object
    pub async fn fetch_listing(&self, limit: u32) -> Result<Listing> {
        let url = self.listing_url(limit);
        tracing::debug!("Fetching listing: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::RemoteUnavailable {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let decoded: ListingResponse = serde_json::from_slice(&body)?;
        Ok(decoded.into_listing())
    }

    /// Resolves an asset path against the remote base URL
    pub fn resolve_asset_url(&self, path: &str) -> Result<Url> {
        Ok(resolve_asset_url(&self.base_url, path)?)
    }

    /// Fetches the raw bytes of one asset
    ///
    /// Only HTTP 200 counts as success; anything else is `AssetFetchFailed`.
    pub async fn fetch_asset(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(MirrorError::AssetFetchFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
