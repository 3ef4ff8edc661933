//! Application-facing entry points
//!
//! `MirrorService` bundles the catalog, coordinator, and search index behind the
//! operations an API layer or the CLI needs: triggering crawls, listing run logs,
//! searching, paging through images, and deleting images.

use crate::config::Config;
use crate::crawler::{spawn_crawl, Coordinator, ScheduleSettings, Scheduler};
use crate::search::SearchIndex;
use crate::storage::{
    lock_catalog, open_catalog, share, CatalogStore, CrawlRunLog, ImageRecord, SharedCatalog,
    SqliteCatalog,
};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// One page of catalog images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePage {
    pub data: Vec<ImageRecord>,
    pub total: u64,
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

/// Facade over the ingestion pipeline and catalog
pub struct MirrorService {
    config: Config,
    catalog: SharedCatalog,
    coordinator: Arc<Coordinator>,
    search: SearchIndex,
}

impl MirrorService {
    /// Opens the catalog named in `config` and wires up the pipeline
    pub fn open(config: Config) -> Result<Self> {
        let catalog = open_catalog(Path::new(&config.storage.database_path))?;
        Self::with_catalog(config, catalog)
    }

    /// Builds the service around an already-open catalog
    pub fn with_catalog(config: Config, catalog: SqliteCatalog) -> Result<Self> {
        let catalog = share(catalog);
        let coordinator = Coordinator::new(&config, catalog.clone())?;

        Ok(Self {
            search: SearchIndex::new(catalog.clone()),
            coordinator: Arc::new(coordinator),
            catalog,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    pub fn image_root(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.image_root)
    }

    /// Starts a crawl in the background and returns immediately
    ///
    /// Uses the configured default page size when `limit` is `None`. The
    /// outcome is only visible through the run logs; the handle may be dropped.
    pub fn trigger_crawl(&self, limit: Option<u32>) -> JoinHandle<()> {
        let limit = limit.unwrap_or(self.config.crawler.default_limit);
        tracing::info!("Crawl triggered (limit {})", limit);
        spawn_crawl(self.coordinator.clone(), limit)
    }

    /// Runs a crawl to completion and returns its run log
    pub async fn run_crawl(&self, limit: Option<u32>) -> Result<CrawlRunLog> {
        let limit = limit.unwrap_or(self.config.crawler.default_limit);
        self.coordinator.run_crawl(limit).await
    }

    /// Starts the periodic scheduler (and the startup full sync when empty)
    pub fn start_scheduler(&self) -> Result<Scheduler> {
        Scheduler::start(
            self.coordinator.clone(),
            ScheduleSettings::from(&self.config.crawler),
        )
    }

    /// Lists run logs, newest first
    pub fn list_run_logs(&self, offset: u64, limit: u64) -> Result<Vec<CrawlRunLog>> {
        Ok(lock_catalog(&self.catalog)?.list_run_logs(offset, limit)?)
    }

    /// Searches image titles
    pub fn search(&self, query: &str, limit: u64) -> Result<Vec<ImageRecord>> {
        self.search.search(query, limit)
    }

    /// Lists images one page at a time, newest first
    ///
    /// `page` is 1-based; page 0 is treated as page 1.
    pub fn list_images(&self, page: u64, limit: u64) -> Result<ImagePage> {
        let page = page.max(1);
        let offset = (page - 1).saturating_mul(limit);

        let catalog = lock_catalog(&self.catalog)?;
        let total = catalog.count_images()?;
        let data = catalog.list_images(offset, limit)?;

        Ok(ImagePage {
            data,
            total,
            page,
            limit,
        })
    }

    /// Deletes an image record and then its local file
    ///
    /// The record is authoritative: once it is gone the call succeeds, and a
    /// file that cannot be removed is only logged.
    pub async fn delete_image(&self, id: i64) -> Result<Option<ImageRecord>> {
        let removed = lock_catalog(&self.catalog)?.delete_image(id)?;

        if let Some(record) = &removed {
            let path = self.image_root().join(&record.local_path);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("Image file {} was already gone", path.display());
                }
                Err(e) => {
                    tracing::warn!("Failed to remove image file {}: {}", path.display(), e);
                }
            }
            tracing::info!("Deleted image {} (remote id {})", record.id, record.remote_id);
        }

        Ok(removed)
    }
}
