//! # Product Search Shared
//!
//! This crate defines shared data structures used across the product search service.
//! It includes the product snapshot carried by catalog events, the result page returned
//! from searches, and the query normalization used for cache keys.

pub mod types;

pub use types::product::Product;
pub use types::search_query::{normalize_query, SearchQuery, DEFAULT_PAGE_SIZE};
pub use types::search_result::SearchPage;
