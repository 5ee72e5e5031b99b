//! # Product Search Repository
//!
//! This crate provides traits and implementations for the backends behind the
//! product search service: the search index (OpenSearch) and the key/value cache
//! (Redis, or an in-process store), plus the services application code uses on top
//! of them.

pub mod cache;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod redis;
pub mod service;
pub mod types;
pub mod utils;

pub use crate::cache::SearchCache;
pub use crate::config::{CacheConfig, SearchIndexServiceConfig};
pub use crate::errors::{CacheError, SearchIndexError};
pub use crate::interfaces::{CacheStore, SearchIndexProvider};
pub use crate::memory::InMemoryCacheStore;
pub use crate::opensearch::OpenSearchProvider;
pub use crate::redis::RedisCacheStore;
pub use crate::service::SearchIndexService;
pub use crate::types::SearchRequest;
pub use crate::utils::{validate_page, validate_product_id};
