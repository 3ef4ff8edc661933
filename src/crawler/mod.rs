//! Crawler module for the ingestion pipeline
//!
//! This module contains the core ingestion logic, including:
//! - Per-item downloading with remote-id deduplication
//! - Crawl run orchestration and run-log bookkeeping
//! - Periodic scheduling of crawl runs

mod coordinator;
mod downloader;
mod scheduler;

pub use coordinator::{Coordinator, RunSummary};
pub use downloader::{local_filename, DownloadOutcome, Downloader, SkipReason};
pub use scheduler::{ScheduleSettings, Scheduler};

pub(crate) use scheduler::spawn_crawl;
