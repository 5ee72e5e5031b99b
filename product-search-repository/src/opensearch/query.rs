//! Query DSL builders and response parsing for the OpenSearch provider.
//!
//! Kept free of I/O so the request bodies and response handling can be tested
//! without a running cluster.

use product_search_shared::{Product, SearchPage};
use serde_json::{json, Value};

use crate::errors::SearchIndexError;
use crate::opensearch::index_config::SEARCH_FIELDS;
use crate::types::SearchRequest;

/// Build the `_search` body for a full-text request.
///
/// The multi-match clause scores hits; the optional `ids` filter restricts them to the
/// allow-list without affecting relevance. Pagination is applied through the request's
/// `from`/`size` parameters, not the body.
pub fn build_search_body(request: &SearchRequest) -> Value {
    let multi_match = json!({
        "multi_match": {
            "query": request.query,
            "fields": SEARCH_FIELDS,
            "type": "best_fields",
            "operator": "or"
        }
    });

    match &request.candidate_ids {
        Some(ids) => json!({
            "track_total_hits": true,
            "query": {
                "bool": {
                    "must": [multi_match],
                    "filter": [
                        { "ids": { "values": ids } }
                    ]
                }
            }
        }),
        None => json!({
            "track_total_hits": true,
            "query": multi_match
        }),
    }
}

/// Build the body for one page of an ordered scan over every document.
pub fn build_scan_body(after: Option<&str>, limit: usize) -> Value {
    let mut body = json!({
        "size": limit,
        "query": { "match_all": {} },
        "sort": [
            { "product_id": "asc" }
        ]
    });

    if let Some(after) = after {
        body["search_after"] = json!([after]);
    }

    body
}

/// Parse a `_search` response into a page.
pub fn parse_search_response(
    body: &Value,
    page: u32,
    size: u32,
) -> Result<SearchPage, SearchIndexError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| SearchIndexError::parse("Search response has no 'hits' object"))?;

    // `hits.total` is an object in current versions and a bare number in older ones.
    let total_count = match hits.get("total") {
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        Some(Value::Number(total)) => total.as_u64().unwrap_or(0),
        _ => 0,
    };

    let items = parse_hits(hits)?;

    Ok(SearchPage::new(items, total_count, page, size))
}

/// Parse the documents of a scan page.
pub fn parse_scan_response(body: &Value) -> Result<Vec<Product>, SearchIndexError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| SearchIndexError::parse("Scan response has no 'hits' object"))?;
    parse_hits(hits)
}

/// Parse a `_doc` GET response. `found: false` is `None`.
pub fn parse_get_response(body: &Value) -> Result<Option<Product>, SearchIndexError> {
    if !body.get("found").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(None);
    }

    let source = body
        .get("_source")
        .ok_or_else(|| SearchIndexError::parse("Get response has no '_source'"))?;

    serde_json::from_value(source.clone())
        .map(Some)
        .map_err(|e| SearchIndexError::parse(format!("Invalid product document: {}", e)))
}

fn parse_hits(hits: &Value) -> Result<Vec<Product>, SearchIndexError> {
    let entries = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchIndexError::parse("Response has no 'hits.hits' array"))?;

    entries
        .iter()
        .map(|hit| {
            let source = hit
                .get("_source")
                .ok_or_else(|| SearchIndexError::parse("Hit has no '_source'"))?;
            serde_json::from_value::<Product>(source.clone())
                .map_err(|e| SearchIndexError::parse(format!("Invalid product document: {}", e)))
        })
        .collect()
}
