//! Key/value store trait behind the cache layer.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CacheError;

/// Raw string key/value operations the cache layer needs from its store.
///
/// Implementations must bound every call in time; `SearchCache` relies on failures
/// returning promptly so it can degrade to a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value. A missing or expired key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value unconditionally. `ttl = None` means the key never expires.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Write a value only if the key is absent.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The value was written
    /// * `Ok(false)` - The key already existed and was left untouched
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// List every key starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    /// Round-trip to the store.
    async fn ping(&self) -> Result<(), CacheError>;
}
