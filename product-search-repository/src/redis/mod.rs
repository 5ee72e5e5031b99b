//! Redis implementation of the cache store.

mod store;

pub use store::RedisCacheStore;
