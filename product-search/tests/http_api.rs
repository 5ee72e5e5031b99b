//! HTTP-level tests for the search API.
//!
//! Drive the axum router in-process over the mock engine and an in-memory cache.

mod common;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use common::{product, Harness};
use product_search::server::{create_app, AppState};

fn app(harness: &Harness) -> axum::Router {
    create_app(AppState {
        query: harness.query.clone(),
    })
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn seeded() -> Harness {
    let harness = Harness::new();
    for p in [
        product("P1", "Nike Air", 120.0),
        product("P2", "Nike Zoom", 220.0),
        product("P3", "Adidas Samba", 90.0),
    ] {
        harness.processor.upsert(&p).await.unwrap();
    }
    harness
}

#[tokio::test]
async fn test_search_query_returns_page() {
    let harness = seeded().await;

    let (status, body) = send(app(&harness), get("/search/query?q=nike&page=1&size=1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["TotalCount"], 2);
    assert_eq!(body["Page"], 1);
    assert_eq!(body["Size"], 1);
    assert_eq!(body["Items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_query_defaults_page_and_size() {
    let harness = seeded().await;

    let (status, body) = send(app(&harness), get("/search/query?q=samba")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Page"], 1);
    assert_eq!(body["Size"], 20);
    assert_eq!(body["Items"][0]["product_id"], "P3");
}

#[tokio::test]
async fn test_search_query_validation_errors() {
    let harness = seeded().await;

    for uri in [
        "/search/query",
        "/search/query?q=%20%20",
        "/search/query?q=nike&page=0",
        "/search/query?q=nike&size=abc",
        "/search/query?q=nike&page=200&size=100",
        "/search/smart-search?q=nike&minPrice=cheap",
    ] {
        let (status, body) = send(app(&harness), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status"], "error");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_smart_search_price_bounds() {
    let harness = seeded().await;

    let (status, body) = send(
        app(&harness),
        get("/search/smart-search?q=nike&minPrice=100&maxPrice=150"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["TotalCount"], 1);
    assert_eq!(body["Items"][0]["product_id"], "P1");

    let (_, body) = send(app(&harness), get("/search/smart-search?q=nike&minPrice=200")).await;
    assert_eq!(body["Items"][0]["product_id"], "P2");

    let (status, body) = send(
        app(&harness),
        get("/search/smart-search?q=nike&minPrice=500&maxPrice=600"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["TotalCount"], 0);
    assert_eq!(body["Items"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_autocomplete_and_trie_words() {
    let harness = seeded().await;

    let (status, body) = send(app(&harness), get("/search/autocomplete?prefix=NIKE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!(["Nike Air", "Nike Zoom"]));

    let (_, body) = send(app(&harness), get("/search/autocomplete")).await;
    assert_eq!(
        body,
        serde_json::json!(["laptop", "smartphone", "headphones", "keyboard", "monitor"])
    );

    let (status, body) = send(app(&harness), get("/search/trie-words")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_get_product_found_and_missing() {
    let harness = seeded().await;

    let (status, body) = send(app(&harness), get("/search/P1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Nike Air");

    let (status, body) = send(app(&harness), get("/search/P404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_index_product_reaches_every_store() {
    let harness = Harness::new();

    let (status, body) = send(
        app(&harness),
        post_json(
            "/search/index",
            serde_json::json!({
                "product_id": "P9",
                "name": "Desk Lamp",
                "price": 30.0,
                "category": "Lighting"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Message"], "Product indexed");
    assert_eq!(body["ProductId"], "P9");

    assert!(harness.provider.document("P9").is_some());
    assert_eq!(harness.price_index.range_query(25.0, 35.0), vec!["P9".to_string()]);
    assert_eq!(harness.query.autocomplete("desk"), vec!["Desk Lamp".to_string()]);
}

#[tokio::test]
async fn test_index_product_trims_identifier() {
    let harness = Harness::new();

    let (status, body) = send(
        app(&harness),
        post_json(
            "/search/index",
            serde_json::json!({ "product_id": "  P9 ", "name": "Desk Lamp", "price": 30.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ProductId"], "P9");
    assert!(harness.provider.document("P9").is_some());

    harness
        .processor
        .apply(&product_search::consumer::ProductEvent::delete("P9"))
        .await
        .unwrap();
    assert_eq!(harness.provider.len(), 0);
    let (status, _) = send(app(&harness), get("/search/P9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_product_accepts_pascal_case_body() {
    let harness = Harness::new();

    let (status, _) = send(
        app(&harness),
        post_json(
            "/search/index",
            serde_json::json!({ "ProductId": "P5", "Name": "Desk Lamp", "Price": 30.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.provider.document("P5").unwrap().name, "Desk Lamp");
}

#[tokio::test]
async fn test_index_product_rejects_bad_body() {
    let harness = Harness::new();

    let (status, body) = send(
        app(&harness),
        post_json("/search/index", serde_json::json!({ "name": "No id" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let request = Request::builder()
        .method("POST")
        .uri("/search/index")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app(&harness), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_engine_failure_is_internal_error() {
    let harness = Harness::new();
    harness.provider.set_fail_writes(true);

    let (status, body) = send(
        app(&harness),
        post_json(
            "/search/index",
            serde_json::json!({ "product_id": "P1", "name": "Nike Air", "price": 120.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_health_and_clear_cache() {
    let harness = seeded().await;

    let (status, body) = send(app(&harness), get("/search/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Status"], "Healthy");
    assert_eq!(body["Cache"], "Connected");

    let request = Request::builder()
        .method("DELETE")
        .uri("/search/cache")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&harness), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Message"], "Cache cleared");
    assert_eq!(body["Cleared"], 3);
}
