//! Cache layer over a `CacheStore`.
//!
//! Two namespaces share one store: result pages keyed by normalized query with a TTL, and
//! current snapshots keyed by product identifier without expiry.

pub mod keys;
mod search_cache;

pub use search_cache::SearchCache;
