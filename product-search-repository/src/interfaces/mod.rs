//! Interface definitions for the backends behind the product search service.
//!
//! `SearchIndexProvider` abstracts the document-search engine and `CacheStore` the
//! key/value cache, allowing swappable implementations and mocks in tests.

mod cache_store;
mod search_index_provider;

pub use cache_store::CacheStore;
pub use search_index_provider::SearchIndexProvider;
