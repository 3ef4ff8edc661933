//! Remote gallery API access
//!
//! This module contains everything needed to talk to the remote source:
//! - Building the shared HTTP client
//! - Fetching and decoding the listing endpoint
//! - Resolving asset paths against the remote base URL
//! - Fetching raw asset bytes

mod client;
mod listing;

pub use client::{build_http_client, RemoteClient};
pub use listing::{resolve_asset_url, Listing, ListingEntry};
