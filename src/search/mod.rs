//! Keyword search over catalog titles
//!
//! Queries are segmented into words with jieba, since titles are mostly
//! Chinese and carry no spaces between words. A record matches when its title
//! contains any surviving token; results come back newest first.

mod tokenizer;

pub use tokenizer::Tokenizer;

use crate::storage::{lock_catalog, CatalogStore, ImageRecord, SharedCatalog};
use crate::Result;

/// Result cap used when the caller does not give one
pub const DEFAULT_SEARCH_LIMIT: u64 = 50;

/// Title search over a shared catalog
pub struct SearchIndex {
    tokenizer: Tokenizer,
    catalog: SharedCatalog,
}

impl SearchIndex {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            catalog,
        }
    }

    /// Searches titles for any word of `query`
    ///
    /// Blank queries and queries with no token longer than one character
    /// return an empty result without touching the catalog.
    pub fn search(&self, query: &str, limit: u64) -> Result<Vec<ImageRecord>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.tokenizer.tokenize(query);
        if tokens.is_empty() {
            tracing::debug!("Query '{}' has no searchable tokens", query);
            return Ok(Vec::new());
        }

        tracing::debug!("Searching titles for {:?}", tokens);
        let catalog = lock_catalog(&self.catalog)?;
        Ok(catalog.query_by_title_substring_any(&tokens, limit)?)
    }
}
