//! Search result types for the product search service.
//!
//! This module defines the page structure returned from search operations and stored
//! in the query-result cache.

use serde::{Deserialize, Serialize};

use crate::types::product::Product;

/// One page of search results.
///
/// Serialized with PascalCase keys (`TotalCount`, `Page`, `Size`, `Items`), which is both
/// the HTTP response shape and the cached representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SearchPage {
    /// Total number of matching documents.
    /// May be greater than the number of returned items due to pagination.
    pub total_count: u64,

    /// The 1-based page number.
    pub page: u32,

    /// The requested page size.
    pub size: u32,

    /// The products on this page, ordered by relevance.
    pub items: Vec<Product>,
}

impl SearchPage {
    /// Create an empty page for the given coordinates.
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            total_count: 0,
            page,
            size,
            items: Vec::new(),
        }
    }

    /// Create a new search page.
    pub fn new(items: Vec<Product>, total_count: u64, page: u32, size: u32) -> Self {
        Self {
            total_count,
            page,
            size,
            items,
        }
    }

    /// Returns true if there are no items on this page.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if any item on this page has the given identifier.
    pub fn references(&self, product_id: &str) -> bool {
        self.items.iter().any(|p| p.product_id == product_id)
    }
}
