//! Crawl coordinator - drives one crawl run
//!
//! A run moves through a fixed sequence:
//! 1. Create the run log in the `running` state
//! 2. Fetch the remote listing
//! 3. Fan out one download per entry, bounded by `max-concurrent-downloads`
//! 4. Aggregate outcomes once every download has finished
//! 5. Finalize the run log as `success` or `failed`
//!
//! The run log is written exactly twice: at creation and at finalization.

use crate::config::Config;
use crate::crawler::downloader::{DownloadOutcome, Downloader};
use crate::remote::{Listing, RemoteClient};
use crate::storage::{lock_catalog, CatalogStore, CrawlRunLog, SharedCatalog};
use crate::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// Per-run tally of download outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub found: u32,
    pub stored: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunSummary {
    fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Stored(_) => self.stored += 1,
            DownloadOutcome::Skipped(_) => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Main crawl coordinator structure
pub struct Coordinator {
    catalog: SharedCatalog,
    remote: RemoteClient,
    downloader: Arc<Downloader>,
    max_concurrent_downloads: usize,
}

impl Coordinator {
    /// Creates a coordinator with a fresh HTTP client built from `config`
    pub fn new(config: &Config, catalog: SharedCatalog) -> Result<Self> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let remote = RemoteClient::new(&config.remote, timeout)?;
        Ok(Self::with_remote(config, catalog, remote))
    }

    /// Creates a coordinator around an existing remote client
    pub fn with_remote(config: &Config, catalog: SharedCatalog, remote: RemoteClient) -> Self {
        let downloader = Downloader::new(
            remote.clone(),
            catalog.clone(),
            &config.storage.image_root,
        );

        Self {
            catalog,
            remote,
            downloader: Arc::new(downloader),
            max_concurrent_downloads: config.crawler.max_concurrent_downloads.max(1) as usize,
        }
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    /// Runs one crawl and returns its finalized run log
    ///
    /// A failed listing fetch ends the run as `failed`; that is still `Ok` here.
    /// Only catalog errors while writing the run log itself are returned as `Err`.
    pub async fn run_crawl(&self, limit: u32) -> Result<CrawlRunLog> {
        let mut log = CrawlRunLog::start();
        log.id = lock_catalog(&self.catalog)?.insert_run_log(&log)?;
        tracing::info!("Starting crawl run {} (limit {})", log.id, limit);

        match self.crawl(limit).await {
            Ok(summary) => {
                tracing::info!(
                    "Crawl run {} finished: downloaded {}/{} ({} skipped, {} failed)",
                    log.id,
                    summary.stored,
                    summary.found,
                    summary.skipped,
                    summary.failed
                );
                log.finish_success(summary.found, summary.stored);
            }
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", log.id, e);
                log.finish_failed(e.to_string());
            }
        }

        lock_catalog(&self.catalog)?.update_run_log(&log)?;
        Ok(log)
    }

    /// Fetches the listing and downloads every entry
    async fn crawl(&self, limit: u32) -> Result<RunSummary> {
        let listing = self.remote.fetch_listing(limit).await?;
        Ok(self.download_all(listing).await)
    }

    async fn download_all(&self, listing: Listing) -> RunSummary {
        let mut summary = RunSummary {
            found: listing.len() as u32,
            failed: listing.malformed as u32,
            ..RunSummary::default()
        };

        let downloader = self.downloader.clone();
        let mut results = stream::iter(listing.entries)
            .map(move |entry| {
                let downloader = downloader.clone();
                // Each download is its own task, so a hung connection only stalls itself
                tokio::spawn(async move { downloader.download(&entry).await })
            })
            .buffer_unordered(self.max_concurrent_downloads);

        while let Some(result) = results.next().await {
            match result {
                Ok(outcome) => summary.record(&outcome),
                Err(join_err) => {
                    tracing::error!("Download task panicked: {}", join_err);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
