//! This module defines the core data structures used across the product search service.
//! It re-exports specific types like `Product` and `SearchPage`.

pub mod product;
pub mod search_query;
pub mod search_result;

pub use product::Product;
pub use search_query::SearchQuery;
pub use search_result::SearchPage;
