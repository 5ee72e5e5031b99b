//! Query-result and lookup caching on top of a `CacheStore`.

use std::sync::Arc;

use product_search_shared::{Product, SearchPage};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::keys::{self, PRODUCT_PREFIX, QUERY_PREFIX};
use crate::config::CacheConfig;
use crate::interfaces::CacheStore;

/// The cache layer used by the query path and the event processor.
///
/// No method returns an error. Store failures are logged and degrade to a miss or a no-op,
/// so callers never depend on the cache for correctness.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use product_search_repository::{CacheConfig, InMemoryCacheStore, SearchCache};
///
/// let cache = SearchCache::new(Arc::new(InMemoryCacheStore::new()), CacheConfig::default());
/// cache.set_product(&product).await;
/// assert!(cache.get_product(&product.product_id).await.is_some());
/// ```
#[derive(Clone)]
pub struct SearchCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl SearchCache {
    /// Create a cache layer over `store`.
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Read a cached result page for an already-normalized query.
    pub async fn get_cached_page(&self, normalized: &str, page: u32, size: u32) -> Option<SearchPage> {
        let key = keys::query_key(normalized, page, size);
        self.read_json(&key).await
    }

    /// Store a result page unless one is already cached under the same key.
    ///
    /// Returns true if this call wrote the entry.
    pub async fn cache_page(&self, normalized: &str, result: &SearchPage) -> bool {
        let key = keys::query_key(normalized, result.page, result.size);
        let body = match serde_json::to_string(result) {
            Ok(body) => body,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize result page");
                return false;
            }
        };

        match self
            .store
            .set_if_absent(&key, &body, Some(self.config.query_ttl))
            .await
        {
            Ok(written) => {
                debug!(key = %key, written, "Cached result page");
                written
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache result page");
                false
            }
        }
    }

    /// Read the current snapshot of a product from the lookup table.
    pub async fn get_product(&self, product_id: &str) -> Option<Product> {
        self.read_json(&keys::product_key(product_id)).await
    }

    /// Overwrite the lookup entry of a product. Lookup entries never expire.
    pub async fn set_product(&self, product: &Product) {
        let key = keys::product_key(&product.product_id);
        let body = match serde_json::to_string(product) {
            Ok(body) => body,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize product");
                return;
            }
        };

        if let Err(e) = self.store.set(&key, &body, None).await {
            warn!(key = %key, error = %e, "Failed to write lookup entry");
        }
    }

    /// Remove the lookup entry of a product.
    pub async fn remove_product(&self, product_id: &str) {
        let key = keys::product_key(product_id);
        if let Err(e) = self.store.delete(&[key.clone()]).await {
            warn!(key = %key, error = %e, "Failed to remove lookup entry");
        }
    }

    /// Delete every cached result page that lists `product_id`.
    ///
    /// Scans the whole query namespace, so cost grows with the number of cached queries.
    /// Pages that no longer deserialize are deleted as well. Returns the number of
    /// removed keys.
    pub async fn invalidate_queries_referencing(&self, product_id: &str) -> u64 {
        let candidates = match self.store.scan_prefix(QUERY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(product_id = %product_id, error = %e, "Failed to scan cached queries");
                return 0;
            }
        };

        let mut stale = Vec::new();
        for key in candidates {
            let body = match self.store.get(&key).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read cached query");
                    continue;
                }
            };

            match serde_json::from_str::<SearchPage>(&body) {
                Ok(page) if page.references(product_id) => stale.push(key),
                Ok(_) => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping unreadable cached query");
                    stale.push(key);
                }
            }
        }

        if stale.is_empty() {
            return 0;
        }

        match self.store.delete(&stale).await {
            Ok(removed) => {
                debug!(product_id = %product_id, removed, "Invalidated cached queries");
                removed
            }
            Err(e) => {
                warn!(product_id = %product_id, error = %e, "Failed to invalidate cached queries");
                0
            }
        }
    }

    /// Returns true if the store answers a ping.
    pub async fn is_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }

    /// Delete every key in both namespaces and return how many were removed.
    pub async fn clear_all(&self) -> u64 {
        let mut cleared = 0;
        for prefix in [QUERY_PREFIX, PRODUCT_PREFIX] {
            let keys = match self.store.scan_prefix(prefix).await {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(prefix = %prefix, error = %e, "Failed to scan cache namespace");
                    continue;
                }
            };
            if keys.is_empty() {
                continue;
            }
            match self.store.delete(&keys).await {
                Ok(removed) => cleared += removed,
                Err(e) => warn!(prefix = %prefix, error = %e, "Failed to clear cache namespace"),
            }
        }
        cleared
    }

    /// Read and decode a JSON entry. An entry that fails to decode is deleted and
    /// reported as a miss.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let body = match self.store.get(key).await {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping corrupted cache entry");
                if let Err(e) = self.store.delete(&[key.to_string()]).await {
                    warn!(key = %key, error = %e, "Failed to drop corrupted cache entry");
                }
                None
            }
        }
    }
}
