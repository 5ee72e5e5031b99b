//! Key layout of the two cache namespaces.

/// Prefix of every query-result key.
pub const QUERY_PREFIX: &str = "search:";

/// Prefix of every lookup-table key.
pub const PRODUCT_PREFIX: &str = "product:";

/// Key of a cached result page. `normalized` must already be normalized.
pub fn query_key(normalized: &str, page: u32, size: u32) -> String {
    format!("{}{}:{}:{}", QUERY_PREFIX, page, size, normalized)
}

/// Key of a lookup entry.
pub fn product_key(product_id: &str) -> String {
    format!("{}{}", PRODUCT_PREFIX, product_id)
}
