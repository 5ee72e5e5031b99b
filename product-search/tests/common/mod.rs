//! Mocks shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use product_search::consumer::{EventOffset, ProductEvent, StreamMessage};
use product_search::errors::IngestError;
use product_search::index::{PrefixIndex, PriceIndex};
use product_search::orchestrator::Consumer;
use product_search::processor::EventProcessor;
use product_search::query::QueryService;
use product_search_repository::types::SearchRequest;
use product_search_repository::{
    CacheConfig, InMemoryCacheStore, SearchCache, SearchIndexError, SearchIndexProvider,
    SearchIndexService,
};
use product_search_shared::{Product, SearchPage};

/// Mock search provider keeping documents in a sorted map.
///
/// A document matches when every query term occurs in its name, description,
/// category, brand or tags. A read delay holds back `get` and `scan` results after
/// the documents were read.
#[derive(Default)]
pub struct MockSearchProvider {
    documents: Mutex<BTreeMap<String, Product>>,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    read_delay: Mutex<Option<Duration>>,
    pub searches: AtomicUsize,
    pub writes: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(products: Vec<Product>) -> Self {
        let provider = Self::new();
        {
            let mut documents = provider.documents.lock().unwrap();
            for product in products {
                documents.insert(product.product_id.clone(), product);
            }
        }
        provider
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn document(&self, product_id: &str) -> Option<Product> {
        self.documents.lock().unwrap().get(product_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    async fn before_write(&self) -> Result<(), SearchIndexError> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SearchIndexError::index("Mock engine unavailable"));
        }
        Ok(())
    }

    async fn after_read(&self) {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn matches(product: &Product, query: &str) -> bool {
    let haystack = format!(
        "{} {} {} {} {}",
        product.name,
        product.description,
        product.category,
        product.brand,
        product.tags.join(" ")
    )
    .to_lowercase();
    query.split_whitespace().all(|term| haystack.contains(term))
}

#[async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn index_document(&self, product: &Product) -> Result<(), SearchIndexError> {
        self.before_write().await?;
        self.documents
            .lock()
            .unwrap()
            .insert(product.product_id.clone(), product.clone());
        Ok(())
    }

    async fn search_documents(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchPage, SearchIndexError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let hits: Vec<Product> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|p| matches(p, &request.query))
            .filter(|p| {
                request
                    .candidate_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&p.product_id))
            })
            .cloned()
            .collect();

        let total = hits.len() as u64;
        let items = hits
            .into_iter()
            .skip(request.offset())
            .take(request.size as usize)
            .collect();
        Ok(SearchPage::new(items, total, request.page, request.size))
    }

    async fn get_document(&self, product_id: &str) -> Result<Option<Product>, SearchIndexError> {
        let document = self.document(product_id);
        self.after_read().await;
        Ok(document)
    }

    async fn delete_document(&self, product_id: &str) -> Result<(), SearchIndexError> {
        self.before_write().await?;
        self.documents.lock().unwrap().remove(product_id);
        Ok(())
    }

    async fn scan_documents(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Product>, SearchIndexError> {
        let page: Vec<Product> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|p| after.map_or(true, |cursor| p.product_id.as_str() > cursor))
            .take(limit)
            .cloned()
            .collect();
        self.after_read().await;
        Ok(page)
    }
}

/// Outcome recorded by the mock consumer for one delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAck {
    pub offset: i64,
    pub success: bool,
}

/// Mock consumer delivering its events one at a time and recording every
/// acknowledgment.
pub struct MockConsumer {
    events: Vec<ProductEvent>,
    error_on_subscribe: bool,
    error_on_run: bool,
    wait_for_shutdown: bool,
    acks: Mutex<Vec<RecordedAck>>,
}

impl MockConsumer {
    pub fn new(events: Vec<ProductEvent>) -> Self {
        Self {
            events,
            error_on_subscribe: false,
            error_on_run: false,
            wait_for_shutdown: false,
            acks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_subscribe_error() -> Self {
        Self {
            error_on_subscribe: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_run_error() -> Self {
        Self {
            error_on_run: true,
            ..Self::new(Vec::new())
        }
    }

    /// Keep running after the last event until shutdown is requested.
    pub fn waiting_for_shutdown(mut self) -> Self {
        self.wait_for_shutdown = true;
        self
    }

    pub fn acks(&self) -> Vec<RecordedAck> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        if self.error_on_subscribe {
            Err(IngestError::KafkaError("Mock subscribe error".to_string()))
        } else {
            Ok(())
        }
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        if self.error_on_run {
            return Err(IngestError::KafkaError("Mock consumer error".to_string()));
        }

        let mut stopped = false;
        for (position, event) in self.events.iter().enumerate() {
            if shutdown.try_recv().is_ok() {
                stopped = true;
                break;
            }

            let offset = EventOffset::new("product-events", 0, position as i64);
            sender
                .send(StreamMessage::Event {
                    event: event.clone(),
                    offset,
                })
                .await
                .map_err(|e| IngestError::ChannelError(e.to_string()))?;

            match ack_receiver.recv().await {
                Some(StreamMessage::Acknowledgment {
                    offset, success, ..
                }) => self.acks.lock().unwrap().push(RecordedAck {
                    offset: offset.offset,
                    success,
                }),
                _ => return Ok(()),
            }
        }

        if self.wait_for_shutdown && !stopped {
            let _ = shutdown.recv().await;
        }

        let _ = sender.send(StreamMessage::End).await;
        Ok(())
    }
}

/// Every store wired the way the service wires them, over the mock engine and an
/// in-memory cache.
pub struct Harness {
    pub provider: Arc<MockSearchProvider>,
    pub cache: SearchCache,
    pub prefix_index: Arc<PrefixIndex>,
    pub price_index: Arc<PriceIndex>,
    pub processor: EventProcessor,
    pub query: QueryService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MockSearchProvider::new())
    }

    pub fn with_provider(provider: MockSearchProvider) -> Self {
        let provider = Arc::new(provider);
        let search = SearchIndexService::new(provider.clone());
        let cache = SearchCache::new(Arc::new(InMemoryCacheStore::new()), CacheConfig::default());
        let prefix_index = Arc::new(PrefixIndex::new());
        let price_index = Arc::new(PriceIndex::new());
        let processor = EventProcessor::new(
            search.clone(),
            cache.clone(),
            prefix_index.clone(),
            price_index.clone(),
        );
        let query = QueryService::new(
            search,
            cache.clone(),
            prefix_index.clone(),
            price_index.clone(),
            processor.clone(),
        );

        Self {
            provider,
            cache,
            prefix_index,
            price_index,
            processor,
            query,
        }
    }
}

pub fn product(id: &str, name: &str, price: f64) -> Product {
    Product::new(id, name, price)
}
