//! Search query types for the product search service.
//!
//! This module defines the query structure used to search the index and the
//! normalization that keeps equivalent queries on the same cache entry.

use serde::{Deserialize, Serialize};

/// Default page size when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Normalize free text for cache keys and backend queries.
///
/// Trims, collapses whitespace runs to a single space and lower-cases.
///
/// ```
/// use product_search_shared::normalize_query;
///
/// assert_eq!(normalize_query("  Nike   AIR "), "nike air");
/// ```
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full-text search request parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    /// The search text.
    pub query: String,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,

    /// Number of items per page.
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl SearchQuery {
    /// Create a query for the first page with the default size.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: default_page(),
            size: default_size(),
        }
    }

    /// Set the page coordinates.
    pub fn with_page(mut self, page: u32, size: u32) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    /// The normalized query text.
    pub fn normalized(&self) -> String {
        normalize_query(&self.query)
    }

    /// Zero-based document offset of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.size as usize
    }

    /// Returns true if the query text is blank.
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }
}
