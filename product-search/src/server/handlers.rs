// HTTP request handlers
use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use product_search_shared::{Product, SearchPage, SearchQuery, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::QueryError;
use crate::query::{CacheClearReport, HealthReport};
use crate::server::state::AppState;

/// Query string of the search routes. Numbers are parsed by hand so that a bad value
/// gets the JSON error body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteParams {
    pub prefix: Option<String>,
}

impl SearchParams {
    fn to_query(&self) -> Result<SearchQuery, QueryError> {
        let page = parse_param("page", self.page.as_deref())?.unwrap_or(1);
        let size = parse_param("size", self.size.as_deref())?.unwrap_or(DEFAULT_PAGE_SIZE);
        Ok(SearchQuery::new(self.q.clone().unwrap_or_default()).with_page(page, size))
    }
}

/// Parse an optional query parameter. Absent and empty values are `None`.
fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, QueryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| QueryError::validation(format!("'{}' must be a valid number.", name))),
    }
}

/// GET /search/query
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, QueryError> {
    let query = params.to_query()?;
    Ok(Json(state.query.search(&query).await?))
}

/// GET /search/smart-search
pub async fn smart_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, QueryError> {
    let query = params.to_query()?;
    let min_price = parse_param::<f64>("minPrice", params.min_price.as_deref())?;
    let max_price = parse_param::<f64>("maxPrice", params.max_price.as_deref())?;

    let page = state
        .query
        .smart_search(&query, min_price, max_price)
        .await?;
    Ok(Json(page))
}

/// GET /search/autocomplete
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Json<Vec<String>> {
    Json(
        state
            .query
            .autocomplete(params.prefix.as_deref().unwrap_or_default()),
    )
}

/// GET /search/trie-words
pub async fn trie_words(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.query.trie_words())
}

/// GET /search/:product_id
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, QueryError> {
    Ok(Json(state.query.get_product(&product_id).await?))
}

/// POST /search/index
pub async fn index_product(
    State(state): State<AppState>,
    payload: Result<Json<Product>, JsonRejection>,
) -> Result<Json<Value>, QueryError> {
    let Json(product) =
        payload.map_err(|e| QueryError::validation(format!("Invalid product body: {}", e)))?;

    let stored = state.query.index_product(&product).await?;

    Ok(Json(serde_json::json!({
        "Message": "Product indexed",
        "ProductId": stored.product_id,
    })))
}

/// GET /search/health
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.query.health().await)
}

/// DELETE /search/cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearReport> {
    Json(state.query.clear_cache().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param::<u32>("page", None).unwrap(), None);
        assert_eq!(parse_param::<u32>("page", Some(" ")).unwrap(), None);
        assert_eq!(parse_param::<u32>("page", Some("3")).unwrap(), Some(3));
        assert!(parse_param::<u32>("page", Some("-1")).is_err());
        assert_eq!(parse_param::<f64>("minPrice", Some("99.5")).unwrap(), Some(99.5));
        assert!(parse_param::<f64>("minPrice", Some("cheap")).is_err());
    }

    #[test]
    fn test_params_default_page() {
        let params = SearchParams {
            q: Some("nike".into()),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.size, DEFAULT_PAGE_SIZE);
    }
}
