//! Sorted price index for range filtering.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// `(price, product_id)` pairs kept in ascending order, ties broken by identifier.
///
/// Every read and write takes the same exclusive lock. Each product has at most one
/// entry: adding a product that is already present replaces its price.
#[derive(Debug, Default)]
pub struct PriceIndex {
    entries: Mutex<Vec<(f64, String)>>,
}

impl PriceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(f64, String)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the price of a product.
    ///
    /// Returns false, leaving the index untouched, if `price` is NaN or infinite.
    pub fn add_product(&self, price: f64, product_id: &str) -> bool {
        if !price.is_finite() {
            warn!(product_id = %product_id, price, "Ignoring non-finite price");
            return false;
        }

        let mut entries = self.lock();
        if let Some(pos) = entries.iter().position(|(_, id)| id == product_id) {
            entries.remove(pos);
        }

        let at = entries.partition_point(|(p, id)| {
            *p < price || (*p == price && id.as_str() < product_id)
        });
        entries.insert(at, (price, product_id.to_string()));
        true
    }

    /// Remove the entry of a product. Returns true if it was present.
    pub fn remove_product(&self, product_id: &str) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|(_, id)| id == product_id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Identifiers whose price lies in `[min, max]`, cheapest first.
    ///
    /// An empty or inverted range yields an empty list. Infinite bounds leave that
    /// side open.
    pub fn range_query(&self, min: f64, max: f64) -> Vec<String> {
        if min.is_nan() || max.is_nan() || min > max {
            return Vec::new();
        }

        let entries = self.lock();
        let lower = entries.partition_point(|(p, _)| *p < min);
        let upper = entries.partition_point(|(p, _)| *p <= max);
        if lower >= upper {
            return Vec::new();
        }

        entries[lower..upper]
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Current price of a product, if indexed.
    #[cfg(test)]
    pub fn price_of(&self, product_id: &str) -> Option<f64> {
        self.lock()
            .iter()
            .find(|(_, id)| id == product_id)
            .map(|(p, _)| *p)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
