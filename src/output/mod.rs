//! Output module for reporting catalog contents
//!
//! This module handles:
//! - Loading and printing catalog statistics
//! - Printing run logs and search results for the CLI

pub mod stats;

pub use stats::{load_statistics, print_run_log, print_statistics, CatalogStatistics};

use crate::storage::ImageRecord;

/// Prints image records, one per line
pub fn print_images(images: &[ImageRecord]) {
    if images.is_empty() {
        println!("No images found");
        return;
    }

    for image in images {
        println!(
            "  #{} remote={} \"{}\" -> {} ({})",
            image.id, image.remote_id, image.title, image.local_path, image.created_at
        );
    }
}
