//! Error types for the product search repository.
//!
//! This module provides the error types for search index and cache store operations.

mod cache_error;
mod search_index_error;

pub use cache_error::CacheError;
pub use search_index_error::SearchIndexError;
