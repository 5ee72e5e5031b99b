//! Product snapshot types.
//!
//! This module defines the document structure that is indexed in the search engine,
//! stored in the lookup cache and carried by catalog change events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Complete set of product attributes at a point in time.
///
/// A snapshot is immutable once captured: the next snapshot sharing its `product_id`
/// replaces it wholesale in every store. Field names are snake_case on the wire; the
/// PascalCase names emitted by the catalog producer are accepted on input.
///
/// Missing fields deserialize to their defaults so that partial catalog payloads are
/// still indexable; only `product_id` is required to be non-blank (see [`Product::is_valid`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Product {
    #[serde(alias = "ProductId")]
    pub product_id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Description")]
    pub description: String,
    #[serde(alias = "Price")]
    pub price: f64,
    #[serde(alias = "Category")]
    pub category: String,
    #[serde(alias = "Subcategory")]
    pub subcategory: String,
    /// Free-form attributes (e.g. `color`, `size`), searchable by value.
    #[serde(alias = "Attributes")]
    pub attributes: BTreeMap<String, String>,
    #[serde(alias = "Stock")]
    pub stock: i32,
    #[serde(alias = "Brand")]
    pub brand: String,
    #[serde(alias = "Rating")]
    pub rating: f64,
    #[serde(alias = "Tags")]
    pub tags: Vec<String>,
    #[serde(alias = "RelatedProducts")]
    pub related_products: Vec<String>,
    #[serde(alias = "ImageUrl")]
    pub image_url: String,
}

impl Product {
    /// Create a snapshot with the given identifier, name and price.
    ///
    /// # Example
    ///
    /// ```
    /// use product_search_shared::Product;
    ///
    /// let product = Product::new("P1", "Nike Air", 120.0);
    /// assert_eq!(product.product_id, "P1");
    /// ```
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            ..Default::default()
        }
    }

    /// Returns true if the snapshot carries a usable identifier.
    pub fn is_valid(&self) -> bool {
        !self.product_id.trim().is_empty()
    }

    /// Returns true if the price can be placed in a sorted price index.
    pub fn has_indexable_price(&self) -> bool {
        self.price.is_finite()
    }
}
