//! Statistics generation from the catalog
//!
//! This module provides functionality for extracting and displaying
//! catalog and crawl-run statistics from the storage layer.

use crate::storage::{CatalogStore, CrawlRunLog, RunStatus, StorageResult};
use std::collections::HashMap;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Total number of mirrored images
    pub total_images: u64,

    /// Count of run logs by status
    pub runs_by_status: HashMap<RunStatus, u64>,

    /// Most recent run, if any
    pub latest_run: Option<CrawlRunLog>,
}

impl CatalogStatistics {
    pub fn total_runs(&self) -> u64 {
        self.runs_by_status.values().sum()
    }
}

/// Loads statistics from the catalog
pub fn load_statistics(catalog: &dyn CatalogStore) -> StorageResult<CatalogStatistics> {
    let total_images = catalog.count_images()?;

    let mut runs_by_status = HashMap::new();
    for status in [RunStatus::Running, RunStatus::Success, RunStatus::Failed] {
        let count = catalog.count_run_logs_by_status(status)?;
        if count > 0 {
            runs_by_status.insert(status, count);
        }
    }

    let latest_run = catalog.list_run_logs(0, 1)?.into_iter().next();

    Ok(CatalogStatistics {
        total_images,
        runs_by_status,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Images mirrored: {}", stats.total_images);
    println!("  Crawl runs: {}", stats.total_runs());
    println!();

    if !stats.runs_by_status.is_empty() {
        println!("Runs by Status:");
        let mut status_counts: Vec<_> = stats.runs_by_status.iter().collect();
        status_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (status, count) in status_counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        print_run_log(run);
    }
}

/// Prints one run log line
pub fn print_run_log(log: &CrawlRunLog) {
    match &log.error_message {
        Some(error) => println!(
            "  #{} [{}] {} found={} downloaded={} error={}",
            log.id, log.status, log.created_at, log.images_found, log.images_downloaded, error
        ),
        None => println!(
            "  #{} [{}] {} found={} downloaded={}",
            log.id, log.status, log.created_at, log.images_found, log.images_downloaded
        ),
    }
}
