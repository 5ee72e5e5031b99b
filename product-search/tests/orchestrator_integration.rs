//! Integration tests for the product search orchestrator.
//!
//! These tests use the real Orchestrator, EventProcessor and QueryService but mock
//! the Kafka consumer and the search engine to ensure reliable testing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use common::{product, Harness, MockConsumer, MockSearchProvider, RecordedAck};
use product_search::consumer::ProductEvent;
use product_search::errors::{IngestError, QueryError};
use product_search::orchestrator::{Orchestrator, OrchestratorConfig};
use product_search_shared::SearchQuery;

/// Run one orchestrator over `events` and return the consumer to inspect its acks.
async fn run_events(harness: &Harness, events: Vec<ProductEvent>) -> Arc<MockConsumer> {
    let consumer = Arc::new(MockConsumer::new(events));
    let orchestrator = Orchestrator::new(consumer.clone(), harness.processor.clone());

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.is_ok(), "Orchestrator should finish");
    assert!(result.unwrap().is_ok(), "Orchestrator should succeed");

    consumer
}

#[tokio::test]
async fn test_insert_query_delete_scenario() {
    let harness = Harness::new();

    let consumer = run_events(
        &harness,
        vec![ProductEvent::created(product("P1", "Nike Air", 120.0))],
    )
    .await;
    assert_eq!(
        consumer.acks(),
        vec![RecordedAck {
            offset: 0,
            success: true
        }]
    );

    let page = harness.query.search(&SearchQuery::new("Nike")).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert!(page.references("P1"));

    assert_eq!(harness.query.autocomplete("nike"), vec!["Nike Air".to_string()]);
    assert_eq!(harness.price_index.range_query(100.0, 150.0), vec!["P1".to_string()]);

    run_events(&harness, vec![ProductEvent::delete("P1")]).await;

    // The cached page referencing P1 was invalidated by the delete.
    let page = harness.query.search(&SearchQuery::new("Nike")).await.unwrap();
    assert!(!page.references("P1"));

    let err = harness.query.get_product("P1").await.unwrap_err();
    assert!(matches!(err, QueryError::NotFound(_)));
    assert!(harness.cache.get_product("P1").await.is_none());
    assert!(harness.query.autocomplete("nike").is_empty());
    assert!(harness.price_index.range_query(100.0, 150.0).is_empty());
}

#[tokio::test]
async fn test_indexed_product_matches_any_field() {
    let harness = Harness::new();
    let mut shoe = product("P2", "Pegasus 40", 130.0);
    shoe.brand = "Nike".to_string();
    shoe.category = "Running".to_string();
    shoe.tags = vec!["marathon".to_string()];

    run_events(&harness, vec![ProductEvent::created(shoe)]).await;

    for text in ["pegasus", "NIKE", "running", "marathon"] {
        let page = harness.query.search(&SearchQuery::new(text)).await.unwrap();
        assert!(page.references("P2"), "query {:?} should match", text);
    }
}

#[tokio::test]
async fn test_replaying_an_event_is_idempotent() {
    let harness = Harness::new();
    let event = ProductEvent::created(product("P1", "Nike Air", 120.0));

    let consumer = run_events(&harness, vec![event.clone(), event]).await;

    assert!(consumer.acks().iter().all(|ack| ack.success));
    assert_eq!(harness.provider.len(), 1);
    assert_eq!(harness.price_index.len(), 1);
    assert_eq!(harness.price_index.range_query(0.0, 1000.0), vec!["P1".to_string()]);
    assert_eq!(harness.query.trie_words(), vec!["Nike Air".to_string()]);
}

#[tokio::test]
async fn test_price_updates_replace_previous_price() {
    let harness = Harness::new();

    run_events(
        &harness,
        vec![
            ProductEvent::created(product("P1", "Nike Air", 120.0)),
            ProductEvent::updated(product("P1", "Nike Air", 150.0)),
            ProductEvent::updated(product("P1", "Nike Air", 100.0)),
        ],
    )
    .await;

    assert!(harness
        .price_index
        .range_query(90.0, 110.0)
        .contains(&"P1".to_string()));
    assert!(!harness
        .price_index
        .range_query(140.0, 160.0)
        .contains(&"P1".to_string()));
    assert_eq!(harness.provider.document("P1").unwrap().price, 100.0);
}

#[tokio::test]
async fn test_renamed_product_leaves_autocomplete() {
    let harness = Harness::new();

    run_events(
        &harness,
        vec![
            ProductEvent::created(product("P1", "Nike Air", 120.0)),
            ProductEvent::updated(product("P1", "Nike Air Max", 120.0)),
        ],
    )
    .await;

    assert_eq!(
        harness.query.autocomplete("nike air"),
        vec!["Nike Air Max".to_string()]
    );
}

#[tokio::test]
async fn test_engine_failure_sends_nack() {
    let harness = Harness::new();
    harness.provider.set_fail_writes(true);

    let consumer = Arc::new(MockConsumer::new(vec![ProductEvent::created(product(
        "P1", "Nike Air", 120.0,
    ))]));
    let orchestrator = Orchestrator::new(consumer.clone(), harness.processor.clone());

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(
        consumer.acks(),
        vec![RecordedAck {
            offset: 0,
            success: false
        }]
    );
    let stats = orchestrator.stats();
    assert_eq!(stats.events_processed, 1);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.upserts, 0);

    // Nothing after the engine write was applied.
    assert!(harness.cache.get_product("P1").await.is_none());
    assert!(harness.price_index.is_empty());
    assert!(harness.query.trie_words().is_empty());
}

#[tokio::test]
async fn test_redelivery_after_failure_converges() {
    let harness = Harness::new();
    let event = ProductEvent::created(product("P1", "Nike Air", 120.0));

    harness.provider.set_fail_writes(true);
    run_events(&harness, vec![event.clone()]).await;

    harness.provider.set_fail_writes(false);
    let consumer = run_events(&harness, vec![event]).await;

    assert!(consumer.acks()[0].success);
    assert_eq!(harness.price_index.range_query(100.0, 150.0), vec!["P1".to_string()]);
    assert_eq!(harness.query.get_product("P1").await.unwrap().name, "Nike Air");
}

#[tokio::test]
async fn test_stats_count_upserts_and_deletes() {
    let harness = Harness::new();
    let consumer = Arc::new(MockConsumer::new(vec![
        ProductEvent::created(product("P1", "Nike Air", 120.0)),
        ProductEvent::created(product("P2", "Adidas Samba", 90.0)),
        ProductEvent::delete("P1"),
    ]));
    let orchestrator = Orchestrator::with_config(
        consumer.clone(),
        harness.processor.clone(),
        OrchestratorConfig {
            channel_buffer_size: 16,
            ..Default::default()
        },
    );

    orchestrator.run().await.unwrap();

    let stats = orchestrator.stats();
    assert_eq!(stats.events_processed, 3);
    assert_eq!(stats.upserts, 2);
    assert_eq!(stats.deletes, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(consumer.acks().len(), 3);
}

#[tokio::test]
async fn test_subscribe_error_propagates() {
    let harness = Harness::new();
    let orchestrator = Orchestrator::new(
        Arc::new(MockConsumer::with_subscribe_error()),
        harness.processor.clone(),
    );

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;

    match result.unwrap() {
        Err(IngestError::KafkaError(msg)) => assert!(msg.contains("Mock subscribe error")),
        other => panic!("Expected KafkaError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_consumer_error_propagates() {
    let harness = Harness::new();
    let orchestrator = Orchestrator::new(
        Arc::new(MockConsumer::with_run_error()),
        harness.processor.clone(),
    );

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(matches!(result.unwrap(), Err(IngestError::KafkaError(_))));
}

#[tokio::test]
async fn test_shutdown_stops_idle_consumer() {
    let harness = Harness::new();
    let consumer = Arc::new(MockConsumer::new(Vec::new()).waiting_for_shutdown());
    let orchestrator = Arc::new(Orchestrator::new(consumer, harness.processor.clone()));

    let runner = Arc::clone(&orchestrator);
    let handle = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.shutdown();

    let result = timeout(Duration::from_secs(5), handle).await;
    assert!(result.unwrap().unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drains_in_flight_event() {
    let provider = MockSearchProvider::new();
    provider.set_write_delay(Duration::from_millis(100));
    let harness = Harness::with_provider(provider);

    let consumer = Arc::new(MockConsumer::new(vec![
        ProductEvent::created(product("P1", "Nike Air", 120.0)),
        ProductEvent::created(product("P2", "Adidas Samba", 90.0)),
    ]));
    let orchestrator = Arc::new(Orchestrator::new(
        consumer.clone(),
        harness.processor.clone(),
    ));

    let runner = Arc::clone(&orchestrator);
    let handle = tokio::spawn(async move { runner.run().await });

    // P1 is being written when shutdown is requested.
    tokio::time::sleep(Duration::from_millis(20)).await;
    orchestrator.shutdown();

    let result = timeout(Duration::from_secs(5), handle).await;
    assert!(result.unwrap().unwrap().is_ok());

    assert_eq!(
        consumer.acks(),
        vec![RecordedAck {
            offset: 0,
            success: true
        }]
    );
    assert!(harness.provider.document("P1").is_some());
    assert!(harness.provider.document("P2").is_none());
}

#[tokio::test]
async fn test_rebuild_indexes_from_engine() {
    let harness = Harness::with_provider(MockSearchProvider::with_documents(vec![
        product("P1", "Nike Air", 120.0),
        product("P2", "Adidas Samba", 90.0),
        product("P3", "Puma Suede", 70.0),
    ]));

    let loaded = harness.processor.rebuild_indexes(2).await.unwrap();

    assert_eq!(loaded, 3);
    assert_eq!(harness.query.autocomplete("puma"), vec!["Puma Suede".to_string()]);
    assert_eq!(
        harness.price_index.range_query(80.0, 130.0),
        vec!["P2".to_string(), "P1".to_string()]
    );
    assert!(harness.cache.get_product("P3").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_delete_during_rebuild_page_is_not_undone() {
    let provider = MockSearchProvider::with_documents(vec![
        product("P1", "Nike Air", 120.0),
        product("P2", "Adidas Samba", 90.0),
    ]);
    provider.set_read_delay(Duration::from_millis(100));
    let harness = Harness::with_provider(provider);

    let processor = harness.processor.clone();
    let rebuild = tokio::spawn(async move { processor.rebuild_indexes(10).await });

    // The rebuild page holding P1 has been read but not yet written.
    tokio::time::sleep(Duration::from_millis(20)).await;
    harness
        .processor
        .apply(&ProductEvent::delete("P1"))
        .await
        .unwrap();

    assert_eq!(rebuild.await.unwrap().unwrap(), 2);
    assert!(harness.cache.get_product("P1").await.is_none());
    assert!(matches!(
        harness.query.get_product("P1").await.unwrap_err(),
        QueryError::NotFound(_)
    ));
    assert_eq!(harness.query.trie_words(), vec!["Adidas Samba".to_string()]);
    assert_eq!(harness.price_index.range_query(0.0, 1000.0), vec!["P2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_update_during_rebuild_page_keeps_new_price() {
    let provider = MockSearchProvider::with_documents(vec![product("P1", "Nike Air", 120.0)]);
    provider.set_read_delay(Duration::from_millis(100));
    let harness = Harness::with_provider(provider);

    let processor = harness.processor.clone();
    let rebuild = tokio::spawn(async move { processor.rebuild_indexes(10).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    harness
        .processor
        .apply(&ProductEvent::updated(product("P1", "Nike Air", 150.0)))
        .await
        .unwrap();
    rebuild.await.unwrap().unwrap();

    assert_eq!(harness.cache.get_product("P1").await.unwrap().price, 150.0);
    assert_eq!(harness.price_index.range_query(140.0, 160.0), vec!["P1".to_string()]);
    assert!(harness.price_index.range_query(110.0, 130.0).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lookup_fill_does_not_resurrect_deleted_product() {
    let provider = MockSearchProvider::with_documents(vec![product("P1", "Nike Air", 120.0)]);
    provider.set_read_delay(Duration::from_millis(100));
    let harness = Harness::with_provider(provider);

    let query = harness.query.clone();
    let lookup = tokio::spawn(async move { query.get_product("P1").await });

    // The lookup has read P1 from the engine but not yet cached it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    harness
        .processor
        .apply(&ProductEvent::delete("P1"))
        .await
        .unwrap();

    assert_eq!(lookup.await.unwrap().unwrap().name, "Nike Air");
    assert!(harness.cache.get_product("P1").await.is_none());
    assert!(matches!(
        harness.query.get_product("P1").await.unwrap_err(),
        QueryError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_shutdown_before_run_is_honored() {
    let harness = Harness::new();
    let consumer = Arc::new(
        MockConsumer::new(vec![ProductEvent::created(product("P1", "Nike Air", 120.0))])
            .waiting_for_shutdown(),
    );
    let orchestrator = Orchestrator::new(consumer.clone(), harness.processor.clone());

    orchestrator.shutdown();
    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;

    assert!(result.unwrap().is_ok());
    assert!(consumer.acks().is_empty());
    assert!(harness.provider.document("P1").is_none());
}
