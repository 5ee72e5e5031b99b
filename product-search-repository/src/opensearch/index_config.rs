//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the product search index.

use serde_json::{json, Value};

/// The default name of the product index.
pub const INDEX_NAME: &str = "products";

/// Fields searched by full-text queries, in boost order.
pub const SEARCH_FIELDS: &[&str] = &[
    "name^3",
    "brand^2",
    "tags^2",
    "category",
    "subcategory",
    "description",
    "attributes.*",
];

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The index name used for all operations.
    pub name: String,
    /// Number of primary shards used when the index is created.
    pub shards: u32,
    /// Number of replicas used when the index is created.
    pub replicas: u32,
}

impl IndexConfig {
    /// Create a new index configuration with default sharding.
    ///
    /// # Arguments
    ///
    /// * `name` - The index name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shards: 2,
            replicas: 1,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(INDEX_NAME)
    }
}

/// Get the index settings and mappings for the product index.
///
/// The configuration includes:
/// - **text + keyword**: `name`, `brand`, `category`, `subcategory` and `tags` are analyzed
///   for full-text matching and keep a `raw` keyword sub-field for exact filters
/// - **dynamic template**: every `attributes.*` value is mapped as text
/// - **keyword `product_id`**: exact lookups and stable sort for scanning
pub fn get_index_settings(config: &IndexConfig) -> Value {
    let text_with_raw = json!({
        "type": "text",
        "fields": {
            "raw": { "type": "keyword" }
        }
    });

    json!({
        "settings": {
            "number_of_shards": config.shards,
            "number_of_replicas": config.replicas
        },
        "mappings": {
            "dynamic_templates": [
                {
                    "attributes_as_text": {
                        "path_match": "attributes.*",
                        "match_mapping_type": "string",
                        "mapping": { "type": "text" }
                    }
                }
            ],
            "properties": {
                "product_id": { "type": "keyword" },
                "name": text_with_raw,
                "description": { "type": "text" },
                "price": { "type": "double" },
                "category": text_with_raw,
                "subcategory": text_with_raw,
                "attributes": { "type": "object" },
                "stock": { "type": "integer" },
                "brand": text_with_raw,
                "rating": { "type": "double" },
                "tags": text_with_raw,
                "related_products": { "type": "keyword" },
                "image_url": { "type": "keyword", "index": false }
            }
        }
    })
}
