//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use product_search_shared::{Product, SearchPage};

use crate::errors::SearchIndexError;
use crate::types::SearchRequest;

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into `SearchIndexService` to enable dependency injection
/// and easy testing with mock implementations. Documents are keyed by `product_id`.
///
/// # Index Initialization
///
/// `ensure_index_exists` is called before the first event is consumed so that the index
/// and its mappings exist before documents are written.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index exists, creating it if necessary.
    ///
    /// Must be idempotent: concurrent or repeated calls succeed once the index exists.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Upsert a product snapshot, replacing any previous document with the same identifier.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Once the backend has acknowledged the write
    /// * `Err(SearchIndexError::IndexError)` - If the backend rejects the write
    async fn index_document(&self, product: &Product) -> Result<(), SearchIndexError>;

    /// Run a paginated full-text query, optionally restricted to `request.candidate_ids`.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchPage)` - The requested page
    /// * `Err(SearchIndexError::SearchError)` - If the backend rejects the query
    async fn search_documents(&self, request: &SearchRequest)
        -> Result<SearchPage, SearchIndexError>;

    /// Fetch a single document by identifier. A missing document is `Ok(None)`.
    async fn get_document(&self, product_id: &str) -> Result<Option<Product>, SearchIndexError>;

    /// Delete a document by identifier.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, product_id: &str) -> Result<(), SearchIndexError>;

    /// Return up to `limit` documents ordered by identifier, starting after `after`.
    ///
    /// Used to page through the whole index; an empty result marks the end.
    async fn scan_documents(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Product>, SearchIndexError>;
}
