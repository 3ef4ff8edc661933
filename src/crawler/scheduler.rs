//! Periodic crawl scheduler
//!
//! This module handles:
//! - A background ticker that starts a crawl every interval
//! - A one-off full crawl at startup when the catalog is empty
//! - Shutdown through an owned handle instead of process-global state
//!
//! Ticks never wait for the previous run: each one spawns its own task, so a
//! slow run can overlap the next scheduled one. Shutdown stops new ticks and
//! then waits for every run the scheduler started, so no run log is left in
//! the `running` state when the process exits.

use crate::config::CrawlerConfig;
use crate::crawler::coordinator::Coordinator;
use crate::storage::{lock_catalog, CatalogStore};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Timing and sizing of scheduled crawls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Time between scheduled crawls; the first one fires one interval after start
    pub interval: Duration,

    /// Page size of each scheduled crawl
    pub limit: u32,

    /// Page size of the startup crawl on an empty catalog
    pub full_sync_limit: u32,
}

impl From<&CrawlerConfig> for ScheduleSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_minutes.saturating_mul(60)),
            limit: config.default_limit,
            full_sync_limit: config.full_sync_limit,
        }
    }
}

/// Handle to the running scheduler
///
/// Dropping the handle also stops the ticker, since the shutdown channel closes,
/// but only `shutdown` waits for in-flight runs.
pub struct Scheduler {
    ticker: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
    initial_crawl: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts the scheduler on the current tokio runtime
    ///
    /// If the catalog is empty, a full crawl is spawned immediately and
    /// independently of the ticker.
    pub fn start(coordinator: Arc<Coordinator>, settings: ScheduleSettings) -> Result<Self> {
        let image_count = lock_catalog(coordinator.catalog())?.count_images()?;

        let initial_crawl = if image_count == 0 {
            tracing::info!(
                "Catalog is empty, triggering full sync (limit {})",
                settings.full_sync_limit
            );
            Some(spawn_crawl(coordinator.clone(), settings.full_sync_limit))
        } else {
            None
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let ticker = tokio::spawn(run_ticker(coordinator, settings, shutdown_rx));

        tracing::info!(
            "Scheduler started: crawling every {:?} (limit {})",
            settings.interval,
            settings.limit
        );

        Ok(Self {
            ticker,
            shutdown,
            initial_crawl,
        })
    }

    /// Takes the handle of the startup full crawl, if one was triggered
    ///
    /// Once taken, `shutdown` no longer waits for that run; the caller owns it.
    pub fn take_initial_crawl(&mut self) -> Option<JoinHandle<()>> {
        self.initial_crawl.take()
    }

    /// Stops the ticker and waits for every run it started
    ///
    /// Also waits for the startup full crawl unless its handle was taken.
    /// Each run finalizes its own run log, so once this returns none of them is
    /// still `running`.
    pub async fn shutdown(self) {
        let Self {
            ticker,
            shutdown,
            initial_crawl,
        } = self;

        let _ = shutdown.send(true);
        if let Err(e) = ticker.await {
            tracing::error!("Scheduler task ended abnormally: {}", e);
        }

        if let Some(initial) = initial_crawl {
            tracing::info!("Waiting for the startup crawl to finish");
            log_join_error(initial.await);
        }

        tracing::info!("Scheduler stopped");
    }
}

/// Runs one crawl, logging instead of propagating its error
async fn run_logged(coordinator: Arc<Coordinator>, limit: u32) {
    if let Err(e) = coordinator.run_crawl(limit).await {
        tracing::error!("Crawl run could not be recorded: {}", e);
    }
}

/// Spawns one crawl run, logging instead of propagating its error
pub(crate) fn spawn_crawl(coordinator: Arc<Coordinator>, limit: u32) -> JoinHandle<()> {
    tokio::spawn(run_logged(coordinator, limit))
}

fn log_join_error(result: std::result::Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!("Crawl task ended abnormally: {}", e);
    }
}

async fn run_ticker(
    coordinator: Arc<Coordinator>,
    settings: ScheduleSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    let Some(first_tick) = Instant::now().checked_add(settings.interval) else {
        tracing::warn!(
            "Crawl interval {:?} is out of range, no scheduled crawls",
            settings.interval
        );
        let _ = shutdown.changed().await;
        return;
    };

    let mut ticker = interval_at(first_tick, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracing::debug!("Scheduled crawl tick");
                runs.spawn(run_logged(coordinator.clone(), settings.limit));
            }
            Some(joined) = runs.join_next(), if !runs.is_empty() => {
                log_join_error(joined);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    if !runs.is_empty() {
        tracing::info!("Waiting for {} scheduled crawl(s) to finish", runs.len());
    }
    while let Some(joined) = runs.join_next().await {
        log_join_error(joined);
    }
}
