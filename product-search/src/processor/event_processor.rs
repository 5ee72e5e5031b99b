//! Event processor implementation.
//!
//! Applies catalog change events to the search engine, the cache and the in-memory
//! indexes. Only the search-engine write gates progress; everything after it is
//! best-effort and safe to re-apply.

use std::fmt;
use std::sync::Arc;

use product_search_repository::{SearchCache, SearchIndexError, SearchIndexService};
use product_search_shared::Product;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::ProductEvent;
use crate::errors::IngestError;
use crate::index::{PrefixIndex, PriceIndex};

/// How far an event has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApplyStage {
    Received,
    AppliedToEngine,
    AppliedToCache,
    AppliedToIndexes,
    /// The consumer committed the offset past the event.
    Committed,
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::AppliedToEngine => "applied_to_engine",
            Self::AppliedToCache => "applied_to_cache",
            Self::AppliedToIndexes => "applied_to_indexes",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Processor that fans change events out to every store.
///
/// The processor is responsible for:
/// - Writing snapshots to the search engine (the durable step)
/// - Keeping the lookup cache current and dropping stale cached queries
/// - Maintaining the prefix and price indexes
///
/// Events hold the shared side of `gate`. Writers that copy engine state into the
/// cache or the indexes (the startup rebuild and the lookup read-through) hold the
/// exclusive side from their engine read to their last write, so no event lands
/// between the two.
#[derive(Clone)]
pub struct EventProcessor {
    search: SearchIndexService,
    cache: SearchCache,
    prefix_index: Arc<PrefixIndex>,
    price_index: Arc<PriceIndex>,
    gate: Arc<RwLock<()>>,
}

impl EventProcessor {
    /// Create a new event processor.
    pub fn new(
        search: SearchIndexService,
        cache: SearchCache,
        prefix_index: Arc<PrefixIndex>,
        price_index: Arc<PriceIndex>,
    ) -> Self {
        Self {
            search,
            cache,
            prefix_index,
            price_index,
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Make sure the search index exists before events are consumed.
    pub async fn ensure_ready(&self) -> Result<(), IngestError> {
        self.search.ensure_index_exists().await?;
        Ok(())
    }

    /// Apply one change event.
    ///
    /// # Returns
    ///
    /// * `Ok(ApplyStage::AppliedToIndexes)` - The engine write succeeded; the offset may be committed
    /// * `Err(IngestError)` - The engine write failed; the event must be redelivered
    #[instrument(skip(self, event), fields(product_id = %event.product_id(), kind = event.label()))]
    pub async fn apply(&self, event: &ProductEvent) -> Result<ApplyStage, IngestError> {
        match event {
            ProductEvent::Upsert { product, .. } => self.upsert(product).await,
            ProductEvent::Delete { product_id, .. } => self.delete(product_id).await,
        }
    }

    /// Apply a snapshot to every store. Shared by the consumer and the HTTP index route.
    pub async fn upsert(&self, product: &Product) -> Result<ApplyStage, IngestError> {
        let _applying = self.gate.read().await;
        let mut stage = ApplyStage::Received;

        if let Err(e) = self.search.index(product).await {
            error!(stage = %stage, error = %e, "Failed to index product");
            return Err(e.into());
        }
        stage = ApplyStage::AppliedToEngine;

        self.cache.set_product(product).await;
        self.cache
            .invalidate_queries_referencing(&product.product_id)
            .await;
        stage = self.advance(stage, ApplyStage::AppliedToCache);

        self.index_in_memory(product);
        stage = self.advance(stage, ApplyStage::AppliedToIndexes);

        Ok(stage)
    }

    async fn delete(&self, product_id: &str) -> Result<ApplyStage, IngestError> {
        let _applying = self.gate.read().await;
        let mut stage = ApplyStage::Received;

        self.cache.remove_product(product_id).await;
        self.cache.invalidate_queries_referencing(product_id).await;

        if let Err(e) = self.search.delete(product_id).await {
            error!(stage = %stage, error = %e, "Failed to delete product");
            return Err(e.into());
        }
        stage = ApplyStage::AppliedToEngine;
        stage = self.advance(stage, ApplyStage::AppliedToCache);

        self.prefix_index.remove_product(product_id);
        self.price_index.remove_product(product_id);
        stage = self.advance(stage, ApplyStage::AppliedToIndexes);

        Ok(stage)
    }

    fn advance(&self, from: ApplyStage, to: ApplyStage) -> ApplyStage {
        debug!(from = %from, to = %to, "Apply stage");
        to
    }

    fn index_in_memory(&self, product: &Product) {
        self.prefix_index
            .insert_for(&product.product_id, &product.name);

        // A product whose price cannot be indexed must not keep a stale price.
        if product.has_indexable_price() {
            self.price_index.add_product(product.price, &product.product_id);
        } else {
            warn!(product_id = %product.product_id, price = product.price, "Price not indexable");
            self.price_index.remove_product(&product.product_id);
        }
    }

    /// Read a product from the engine and store it in the lookup table.
    ///
    /// Returns `Ok(None)` if the engine has no such document.
    #[instrument(skip(self))]
    pub async fn read_through(
        &self,
        product_id: &str,
    ) -> Result<Option<Product>, SearchIndexError> {
        let _copying = self.gate.write().await;
        let product = self.search.get(product_id).await?;
        if let Some(product) = &product {
            self.cache.set_product(product).await;
        }
        Ok(product)
    }

    /// Load every document in the search engine into the in-memory indexes and the
    /// lookup cache.
    ///
    /// The in-memory indexes start empty after a restart while committed events are not
    /// replayed, so they are rebuilt from the engine. Events keep flowing between pages;
    /// a page is read and written while no event is being applied. Returns the number
    /// of documents loaded.
    #[instrument(skip(self))]
    pub async fn rebuild_indexes(&self, page_size: usize) -> Result<usize, IngestError> {
        let page_size = page_size.max(1);
        let mut after: Option<String> = None;
        let mut loaded = 0;

        loop {
            let _copying = self.gate.write().await;
            let batch = self.search.scan(after.as_deref(), page_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            after = Some(last.product_id.clone());

            for product in &batch {
                if !product.is_valid() {
                    warn!("Skipping stored document without a product id");
                    continue;
                }
                self.index_in_memory(product);
                self.cache.set_product(product).await;
                loaded += 1;
            }

            debug!(loaded, "Rebuilt index page");
            if batch.len() < page_size {
                break;
            }
        }

        info!(
            documents = loaded,
            words = self.prefix_index.get_all().len(),
            prices = self.price_index.len(),
            "Rebuilt in-memory indexes"
        );
        Ok(loaded)
    }
}
