//! Configuration types for the search index service and the cache layer.

use std::time::Duration;

/// OpenSearch's default `index.max_result_window`.
pub const DEFAULT_MAX_RESULT_WINDOW: u32 = 10_000;

/// Default time-to-live for cached query-result pages.
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(10 * 60);

/// Configuration for the SearchIndexService.
#[derive(Debug, Clone)]
pub struct SearchIndexServiceConfig {
    /// Largest page size a caller may request.
    pub max_page_size: u32,
    /// Deepest hit (`page * size`) a caller may reach.
    pub max_result_window: u32,
}

impl Default for SearchIndexServiceConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
        }
    }
}

impl SearchIndexServiceConfig {
    /// Create a config with a custom page size limit.
    pub fn with_max_page_size(max_page_size: u32) -> Self {
        Self {
            max_page_size,
            ..Self::default()
        }
    }
}

/// Configuration for the SearchCache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for query-result pages. Lookup entries never expire.
    pub query_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            query_ttl: DEFAULT_QUERY_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a config with a custom query-result TTL.
    pub fn with_query_ttl(query_ttl: Duration) -> Self {
        Self { query_ttl }
    }
}
