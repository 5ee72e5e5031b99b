//! Search index service implementation.
//!
//! This module provides the main service for interacting with the search index.
//! Application code uses this to upsert, delete, look up and query product documents.
//!
//! # Note on Document Creation
//!
//! There is no separate `create` function: documents are keyed by `product_id`, so
//! `index` creates the document if it doesn't exist and replaces it wholesale if it does.

use std::sync::Arc;

use product_search_shared::{normalize_query, Product, SearchPage};

use crate::config::SearchIndexServiceConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::SearchRequest;
use crate::utils::{validate_page, validate_product_id};

/// The main service for interacting with the search index.
///
/// This is the high-level API that application code should use. It provides input
/// validation, request conversion, and delegates to a `SearchIndexProvider` for
/// actual backend operations. All operations return `SearchIndexError` for consistent
/// error handling.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use product_search_repository::SearchIndexService;
/// use product_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use product_search_shared::Product;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = OpenSearchProvider::new(
///     "http://localhost:9200",
///     IndexConfig::new("products"),
///     Duration::from_secs(5),
/// )
/// .await?;
/// let service = SearchIndexService::new(Arc::new(provider));
///
/// service.index(&Product::new("P1", "Nike Air", 120.0)).await?;
/// let page = service.search("nike", 1, 20).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SearchIndexService {
    provider: Arc<dyn SearchIndexProvider>,
    config: SearchIndexServiceConfig,
}

impl SearchIndexService {
    /// Create a new SearchIndexService with default configuration.
    ///
    /// The default configuration limits page size to 100.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexServiceConfig::default(),
        }
    }

    /// Create a new SearchIndexService with custom configuration.
    pub fn with_config(
        provider: Arc<dyn SearchIndexProvider>,
        config: SearchIndexServiceConfig,
    ) -> Self {
        Self { provider, config }
    }

    /// Create the backing index if it does not exist. Safe to call repeatedly.
    pub async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        self.provider.ensure_index_exists().await
    }

    /// Upsert a product document keyed by its identifier.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Once the backend acknowledged the write
    /// * `Err(SearchIndexError::ValidationError)` - If the identifier is blank or has
    ///   surrounding whitespace, which `delete` and `get` could never address
    /// * `Err(SearchIndexError)` - If the backend rejects the document
    pub async fn index(&self, product: &Product) -> Result<(), SearchIndexError> {
        let product_id = validate_product_id(&product.product_id)?;
        if product_id != product.product_id {
            return Err(SearchIndexError::validation(
                "product_id must not have surrounding whitespace",
            ));
        }
        self.provider.index_document(product).await
    }

    /// Full-text search over every indexed field.
    ///
    /// The query is normalized before it reaches the backend.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchPage)` - The requested page and the total hit count
    /// * `Err(SearchIndexError::ValidationError)` - If `page` or `size` is out of range
    /// * `Err(SearchIndexError)` - If the backend rejects the query
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        size: u32,
    ) -> Result<SearchPage, SearchIndexError> {
        validate_page(
            page,
            size,
            self.config.max_page_size,
            self.config.max_result_window,
        )?;
        let request = SearchRequest::new(normalize_query(query), page, size);
        self.provider.search_documents(&request).await
    }

    /// Full-text search restricted to an allow-list of identifiers.
    ///
    /// `None` behaves like `search`. An empty allow-list returns an empty page without
    /// querying the backend.
    pub async fn smart_search(
        &self,
        query: &str,
        page: u32,
        size: u32,
        candidate_ids: Option<&[String]>,
    ) -> Result<SearchPage, SearchIndexError> {
        validate_page(
            page,
            size,
            self.config.max_page_size,
            self.config.max_result_window,
        )?;

        let request = SearchRequest::new(normalize_query(query), page, size);
        let request = match candidate_ids {
            Some([]) => return Ok(SearchPage::empty(page, size)),
            Some(ids) => request.with_candidates(ids.to_vec()),
            None => request,
        };

        self.provider.search_documents(&request).await
    }

    /// Delete a product document.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    pub async fn delete(&self, product_id: &str) -> Result<(), SearchIndexError> {
        let product_id = validate_product_id(product_id)?;
        self.provider.delete_document(product_id).await
    }

    /// Fetch the stored snapshot of a product, if any.
    pub async fn get(&self, product_id: &str) -> Result<Option<Product>, SearchIndexError> {
        let product_id = validate_product_id(product_id)?;
        self.provider.get_document(product_id).await
    }

    /// Fetch up to `limit` documents ordered by identifier, starting after `after`.
    pub async fn scan(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Product>, SearchIndexError> {
        if limit == 0 {
            return Err(SearchIndexError::validation("'limit' must be >= 1"));
        }
        self.provider.scan_documents(after, limit).await
    }
}
