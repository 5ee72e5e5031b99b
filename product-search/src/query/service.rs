//! Read path of the product search service.
//!
//! Full-text queries go through the query-result cache (cache-aside) before the search
//! engine. Autocomplete and price filtering are answered from the in-memory indexes.

use std::sync::Arc;

use product_search_repository::{SearchCache, SearchIndexService};
use product_search_shared::{Product, SearchPage, SearchQuery};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::errors::QueryError;
use crate::index::{PrefixIndex, PriceIndex};
use crate::processor::EventProcessor;

/// Suggestions returned for a blank autocomplete prefix.
pub const DEFAULT_SUGGESTIONS: [&str; 5] =
    ["laptop", "smartphone", "headphones", "keyboard", "monitor"];

/// Service status with the cache connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthReport {
    pub status: String,
    pub cache: String,
}

/// Outcome of a bulk cache clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CacheClearReport {
    pub message: String,
    pub cleared: u64,
}

/// Query service composing the cache, the search engine and the in-memory indexes.
#[derive(Clone)]
pub struct QueryService {
    search: SearchIndexService,
    cache: SearchCache,
    prefix_index: Arc<PrefixIndex>,
    price_index: Arc<PriceIndex>,
    processor: EventProcessor,
}

impl QueryService {
    /// Create a new query service.
    ///
    /// `processor` is the same upsert path the consumer uses, so products indexed over
    /// HTTP reach every store.
    pub fn new(
        search: SearchIndexService,
        cache: SearchCache,
        prefix_index: Arc<PrefixIndex>,
        price_index: Arc<PriceIndex>,
        processor: EventProcessor,
    ) -> Self {
        Self {
            search,
            cache,
            prefix_index,
            price_index,
            processor,
        }
    }

    /// Full-text search with read-through caching.
    ///
    /// Only non-empty pages are cached, so a product indexed later is not hidden behind
    /// a cached empty result.
    #[instrument(skip(self, query), fields(query = %query.query, page = query.page, size = query.size))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchPage, QueryError> {
        validate_query(query)?;
        let normalized = query.normalized();

        if let Some(cached) = self
            .cache
            .get_cached_page(&normalized, query.page, query.size)
            .await
        {
            debug!(hits = cached.len(), "Query cache hit");
            return Ok(cached);
        }

        let result = self
            .search
            .search(&normalized, query.page, query.size)
            .await?;

        if !result.is_empty() {
            self.cache.cache_page(&normalized, &result).await;
        }

        Ok(result)
    }

    /// Full-text search filtered by price.
    ///
    /// With no bound this is an uncached full-text search. With one bound the other side
    /// is open. An empty candidate set returns an empty page without querying the engine.
    /// Results are never cached.
    #[instrument(skip(self, query), fields(query = %query.query))]
    pub async fn smart_search(
        &self,
        query: &SearchQuery,
        min_price: Option<f64>,
        max_price: Option<f64>,
    ) -> Result<SearchPage, QueryError> {
        validate_query(query)?;
        if min_price.is_some_and(f64::is_nan) || max_price.is_some_and(f64::is_nan) {
            return Err(QueryError::validation("'minPrice' and 'maxPrice' must be numbers."));
        }

        let candidates = match (min_price, max_price) {
            (None, None) => None,
            (min, max) => Some(self.price_index.range_query(
                min.unwrap_or(f64::NEG_INFINITY),
                max.unwrap_or(f64::INFINITY),
            )),
        };

        if let Some(ids) = &candidates {
            debug!(candidates = ids.len(), "Resolved price candidates");
        }

        let result = self
            .search
            .smart_search(&query.query, query.page, query.size, candidates.as_deref())
            .await?;
        Ok(result)
    }

    /// Names starting with `prefix`, case-insensitively.
    pub fn autocomplete(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        }
        self.prefix_index.suggest(prefix)
    }

    /// Every word in the prefix index.
    pub fn trie_words(&self) -> Vec<String> {
        self.prefix_index.get_all()
    }

    /// Look up a product by identifier: lookup cache, then the search engine.
    ///
    /// A miss is filled while no change event is applied, so a concurrent delete cannot
    /// be overwritten by the snapshot read here.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: &str) -> Result<Product, QueryError> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(QueryError::validation("'productId' is required."));
        }

        if let Some(product) = self.cache.get_product(product_id).await {
            return Ok(product);
        }

        match self.processor.read_through(product_id).await? {
            Some(product) => Ok(product),
            None => Err(QueryError::not_found(format!(
                "Product '{}' not found",
                product_id
            ))),
        }
    }

    /// Index a snapshot received over HTTP. The identifier is trimmed before it is
    /// stored; the stored snapshot is returned.
    #[instrument(skip(self, product), fields(product_id = %product.product_id))]
    pub async fn index_product(&self, product: &Product) -> Result<Product, QueryError> {
        if !product.is_valid() {
            return Err(QueryError::validation(
                "Product or product_id cannot be empty.",
            ));
        }

        let mut product = product.clone();
        product.product_id = product.product_id.trim().to_string();

        self.processor
            .upsert(&product)
            .await
            .map_err(|e| QueryError::backend(e.to_string()))?;

        info!("Product indexed");
        Ok(product)
    }

    /// Service status. A cache outage degrades the service but does not fail it.
    pub async fn health(&self) -> HealthReport {
        let (status, cache) = if self.cache.is_healthy().await {
            ("Healthy", "Connected")
        } else {
            ("Degraded", "Unavailable")
        };

        HealthReport {
            status: status.to_string(),
            cache: cache.to_string(),
        }
    }

    /// Drop every cached query page and product lookup.
    pub async fn clear_cache(&self) -> CacheClearReport {
        let cleared = self.cache.clear_all().await;
        info!(cleared, "Cache cleared");

        CacheClearReport {
            message: "Cache cleared".to_string(),
            cleared,
        }
    }
}

fn validate_query(query: &SearchQuery) -> Result<(), QueryError> {
    if query.is_blank() {
        return Err(QueryError::validation("Query parameter 'q' is required."));
    }
    if query.page < 1 || query.size < 1 {
        return Err(QueryError::validation("'page' and 'size' must be >= 1."));
    }
    Ok(())
}
