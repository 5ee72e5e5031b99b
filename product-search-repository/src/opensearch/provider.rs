//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    DeleteParts, GetParts, IndexParts, OpenSearch, SearchParts,
};
use product_search_shared::{Product, SearchPage};
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::opensearch::query;
use crate::types::SearchRequest;

/// OpenSearch provider implementation.
///
/// Provides full-text search capabilities using OpenSearch as the backend. Documents
/// use `product_id` as their `_id`, so every write is an upsert by identifier.
///
/// # Example
///
/// ```ignore
/// use product_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use std::time::Duration;
///
/// let provider = OpenSearchProvider::new(
///     "http://localhost:9200",
///     IndexConfig::new("products"),
///     Duration::from_secs(5),
/// )
/// .await?;
/// provider.ensure_index_exists().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration
    /// * `timeout` - Upper bound for every request
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(
        url: &str,
        index_config: IndexConfig,
        timeout: Duration,
    ) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            timeout_ms = timeout.as_millis() as u64,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    fn index_name(&self) -> &str {
        &self.index_config.name
    }

    /// Read a response body as JSON, mapping failures with `to_error`.
    async fn read_json(
        response: Response,
        to_error: fn(String) -> SearchIndexError,
    ) -> Result<Value, SearchIndexError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| to_error(format!("Failed to read response body: {}", e)))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the index with explicit mappings if it does not exist yet.
    ///
    /// A concurrent creator winning the race (`resource_already_exists_exception`) is
    /// treated as success.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let index = self.index_name();

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings(&self.index_config))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index, "Created search index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            debug!(index = %index, "Index was created concurrently");
            return Ok(());
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(SearchIndexError::index_creation(format!(
            "Index creation failed with status {}: {}",
            status, error_body
        )))
    }

    async fn index_document(&self, product: &Product) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .index(IndexParts::IndexId(self.index_name(), &product.product_id))
            .refresh(Refresh::WaitFor)
            .body(product)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchIndexError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(product_id = %product.product_id, "Document indexed");
        Ok(())
    }

    async fn search_documents(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchPage, SearchIndexError> {
        let body = query::build_search_body(request);

        let response = self
            .client
            .search(SearchParts::Index(&[self.index_name()]))
            .from(request.offset() as i64)
            .size(request.size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Search request failed");
            return Err(SearchIndexError::search(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let json = Self::read_json(response, SearchIndexError::SearchError).await?;
        let page = query::parse_search_response(&json, request.page, request.size)?;

        debug!(
            query = %request.query,
            page = request.page,
            hits = page.len(),
            total = page.total_count,
            "Search completed"
        );
        Ok(page)
    }

    async fn get_document(&self, product_id: &str) -> Result<Option<Product>, SearchIndexError> {
        let response = self
            .client
            .get(GetParts::IndexId(self.index_name(), product_id))
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Get request failed");
            return Err(SearchIndexError::search(format!(
                "Get failed with status {}: {}",
                status, error_body
            )));
        }

        let json = Self::read_json(response, SearchIndexError::SearchError).await?;
        query::parse_get_response(&json)
    }

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, product_id: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(self.index_name(), product_id))
            .refresh(Refresh::WaitFor)
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(product_id = %product_id, "Document deleted");
        Ok(())
    }

    async fn scan_documents(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Product>, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[self.index_name()]))
            .body(query::build_scan_body(after, limit))
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Scan request failed");
            return Err(SearchIndexError::search(format!(
                "Scan failed with status {}: {}",
                status, error_body
            )));
        }

        let json = Self::read_json(response, SearchIndexError::SearchError).await?;
        query::parse_scan_response(&json)
    }
}
