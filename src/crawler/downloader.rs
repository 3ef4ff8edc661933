//! Per-item downloader
//!
//! Turns one listing entry into a stored catalog record:
//! 1. Dedup short-circuit on the remote id (no network call for known items)
//! 2. Resolve the asset URL and fetch its bytes
//! 3. Write the file under the image root
//! 4. Insert the catalog record (file first, then record)
//!
//! Every failure is item-local and reported as `DownloadOutcome::Failed`.

use crate::remote::{ListingEntry, RemoteClient};
use crate::storage::{lock_catalog, now_timestamp, InsertOutcome, NewImage, SharedCatalog};
use crate::storage::{CatalogStore, ImageRecord};
use crate::{MirrorError, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Fallback extension when the remote file name has none
const DEFAULT_EXTENSION: &str = "jpg";

/// Why an entry was not downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The remote id is already in the catalog
    Duplicate,
    /// The entry has no asset path to resolve
    MissingAsset,
    /// The remote id is not a positive integer
    InvalidId,
}

/// Result of processing one listing entry
#[derive(Debug)]
pub enum DownloadOutcome {
    Skipped(SkipReason),
    Stored(ImageRecord),
    Failed(MirrorError),
}

/// Derives the local file name for a downloaded asset
///
/// Format: `{remote_id}_{uuid}.{ext}`, where `ext` comes from the original file
/// name and falls back to `jpg`. The random component keeps names unique across
/// concurrent writers and across runs.
pub fn local_filename(remote_id: i64, original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION);

    format!("{}_{}.{}", remote_id, Uuid::new_v4(), ext)
}

/// Downloads listing entries into the image root and the catalog
pub struct Downloader {
    remote: RemoteClient,
    catalog: SharedCatalog,
    image_root: PathBuf,
}

impl Downloader {
    pub fn new(remote: RemoteClient, catalog: SharedCatalog, image_root: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            catalog,
            image_root: image_root.into(),
        }
    }

    /// Processes one listing entry
    ///
    /// Never returns an error: failures are folded into `DownloadOutcome::Failed`
    /// so sibling downloads are unaffected.
    pub async fn download(&self, entry: &ListingEntry) -> DownloadOutcome {
        if entry.id <= 0 {
            tracing::debug!("Skipping entry with invalid remote id {}", entry.id);
            return DownloadOutcome::Skipped(SkipReason::InvalidId);
        }

        match self.is_known(entry.id) {
            Ok(true) => {
                tracing::debug!("Remote id {} already mirrored", entry.id);
                return DownloadOutcome::Skipped(SkipReason::Duplicate);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Catalog lookup failed for remote id {}: {}", entry.id, e);
                return DownloadOutcome::Failed(e);
            }
        }

        let Some(asset_path) = entry.thumbnail_path.as_deref() else {
            tracing::debug!("Remote id {} has no asset path", entry.id);
            return DownloadOutcome::Skipped(SkipReason::MissingAsset);
        };

        match self.fetch_and_store(entry, asset_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Error processing image {}: {}", entry.id, e);
                DownloadOutcome::Failed(e)
            }
        }
    }

    fn is_known(&self, remote_id: i64) -> Result<bool> {
        let catalog = lock_catalog(&self.catalog)?;
        Ok(catalog.find_by_remote_id(remote_id)?.is_some())
    }

    async fn fetch_and_store(&self, entry: &ListingEntry, asset_path: &str) -> Result<DownloadOutcome> {
        let url = self.remote.resolve_asset_url(asset_path)?;
        tracing::info!("Downloading {}", url);

        let bytes = self.remote.fetch_asset(&url).await?;

        let local_name = local_filename(entry.id, &entry.filename);
        let file_path = self.image_root.join(&local_name);
        tokio::fs::create_dir_all(&self.image_root).await?;
        tokio::fs::write(&file_path, &bytes).await?;

        let image = NewImage {
            remote_id: entry.id,
            title: entry.title.clone(),
            view_count: entry.view_count,
            download_count: entry.download_count,
            thumbnail_url: asset_path.to_string(),
            local_path: local_name,
            filename: entry.filename.clone(),
            duration_label: entry.duration.clone(),
            image_type: entry.image_type.clone(),
            mtime: entry.mtime,
            created_at: now_timestamp(),
        };

        let inserted = {
            let mut catalog = lock_catalog(&self.catalog)?;
            catalog.insert_image(&image)?
        };

        match inserted {
            InsertOutcome::Inserted(record) => Ok(DownloadOutcome::Stored(record)),
            InsertOutcome::Duplicate => {
                // A concurrent run stored this remote id first
                tracing::debug!("Remote id {} was stored concurrently", entry.id);
                if let Err(e) = tokio::fs::remove_file(&file_path).await {
                    tracing::warn!("Failed to remove {}: {}", file_path.display(), e);
                }
                Ok(DownloadOutcome::Skipped(SkipReason::Duplicate))
            }
        }
    }
}
