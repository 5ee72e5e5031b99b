//! Utility functions for the product search repository.

use crate::errors::SearchIndexError;

/// Validate a product identifier.
///
/// # Returns
///
/// * `Ok(&str)` - The trimmed identifier
/// * `Err(SearchIndexError)` - If the identifier is blank
///
/// # Example
///
/// ```
/// use product_search_repository::validate_product_id;
///
/// assert_eq!(validate_product_id(" P1 ").unwrap(), "P1");
/// assert!(validate_product_id("  ").is_err());
/// ```
pub fn validate_product_id(product_id: &str) -> Result<&str, SearchIndexError> {
    let trimmed = product_id.trim();
    if trimmed.is_empty() {
        return Err(SearchIndexError::validation("product_id is required"));
    }
    Ok(trimmed)
}

/// Validate page coordinates against the configured maximum page size and result window.
pub fn validate_page(
    page: u32,
    size: u32,
    max_page_size: u32,
    max_result_window: u32,
) -> Result<(), SearchIndexError> {
    if page < 1 {
        return Err(SearchIndexError::validation("'page' must be >= 1"));
    }
    if size < 1 {
        return Err(SearchIndexError::validation("'size' must be >= 1"));
    }
    if size > max_page_size {
        return Err(SearchIndexError::validation(format!(
            "'size' must be <= {}",
            max_page_size
        )));
    }
    if u64::from(page) * u64::from(size) > u64::from(max_result_window) {
        return Err(SearchIndexError::validation(format!(
            "'page' * 'size' must be <= {}",
            max_result_window
        )));
    }
    Ok(())
}
