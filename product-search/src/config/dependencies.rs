//! Dependency initialization and wiring for the product search service.

use std::sync::Arc;
use std::time::Duration;

use product_search_repository::opensearch::IndexConfig;
use product_search_repository::{
    CacheConfig, CacheStore, InMemoryCacheStore, OpenSearchProvider, RedisCacheStore,
    SearchCache, SearchIndexProvider, SearchIndexService,
};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::settings::{CacheBackend, ConnectionMode, Settings};
use crate::consumer::{
    DeadLetterPolicy, KafkaConnection, KafkaConsumer, KafkaConsumerConfig, KafkaDeadLetterSink,
};
use crate::index::{PrefixIndex, PriceIndex};
use crate::orchestrator::Orchestrator;
use crate::processor::EventProcessor;
use crate::query::QueryService;
use crate::ServiceError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// Shared with the orchestrator; used for the startup index rebuild.
    pub processor: EventProcessor,
    pub query: QueryService,
}

impl Dependencies {
    /// Initialize all dependencies from `settings`.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ServiceError)` - If initialization fails (OpenSearch only in fail-fast mode)
    pub async fn new(settings: &Settings) -> Result<Self, ServiceError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            opensearch_index = %settings.opensearch_index,
            kafka_broker = %settings.kafka_broker,
            kafka_group_id = %settings.kafka_group_id,
            kafka_topic = %settings.kafka_topic,
            cache_backend = ?settings.cache_backend,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        // Initialize OpenSearch provider with retry logic
        let search_provider = Self::connect_to_opensearch(
            &settings.opensearch_url,
            IndexConfig::new(settings.opensearch_index.clone()),
            settings.connection_mode,
            settings.retry_interval,
            settings.backend_timeout,
        )
        .await?;

        info!("OpenSearch connection established");

        let search = SearchIndexService::new(Arc::new(search_provider));
        let cache = SearchCache::new(
            Self::connect_cache(settings).await,
            CacheConfig::with_query_ttl(settings.cache_query_ttl),
        );

        // Initialize Kafka consumer and its dead-letter producer
        let mut connection = KafkaConnection::new(settings.kafka_broker.clone());
        if let (Some(username), Some(password)) =
            (&settings.kafka_username, &settings.kafka_password)
        {
            connection = connection.with_credentials(username.clone(), password.clone());
        }

        let dead_letters = KafkaDeadLetterSink::new(
            &connection,
            settings.dead_letter_topic.clone(),
            settings.backend_timeout,
        )
        .map_err(|e| ServiceError::config(format!("Failed to create dead-letter producer: {}", e)))?;

        let consumer_config = KafkaConsumerConfig {
            group_id: settings.kafka_group_id.clone(),
            topics: vec![settings.kafka_topic.clone()],
            retry_backoff: settings.kafka_retry_backoff,
            dead_letter_policy: DeadLetterPolicy::new(
                settings.dead_letter_max_attempts,
                DeadLetterPolicy::default().retry_delay,
            ),
        };
        let consumer = KafkaConsumer::new(&connection, consumer_config, Arc::new(dead_letters))
            .map_err(|e| ServiceError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        let prefix_index = Arc::new(PrefixIndex::new());
        let price_index = Arc::new(PriceIndex::new());

        let processor = EventProcessor::new(
            search.clone(),
            cache.clone(),
            Arc::clone(&prefix_index),
            Arc::clone(&price_index),
        );

        let query = QueryService::new(
            search,
            cache,
            prefix_index,
            price_index,
            processor.clone(),
        );

        let orchestrator = Orchestrator::new(Arc::new(consumer), processor.clone());

        Ok(Self {
            orchestrator,
            processor,
            query,
        })
    }

    /// Connect to OpenSearch and make sure the index exists, retrying based on the
    /// connection mode.
    async fn connect_to_opensearch(
        url: &str,
        index_config: IndexConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
        timeout: Duration,
    ) -> Result<OpenSearchProvider, ServiceError> {
        loop {
            match Self::try_connect_opensearch(url, index_config.clone(), timeout).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(ServiceError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Attempt to connect to OpenSearch.
    async fn try_connect_opensearch(
        url: &str,
        index_config: IndexConfig,
        timeout: Duration,
    ) -> Result<OpenSearchProvider, ServiceError> {
        let search_provider = OpenSearchProvider::new(url, index_config, timeout)
            .await
            .map_err(|e| {
                ServiceError::config(format!("Failed to create OpenSearch provider: {}", e))
            })?;

        // A cluster that accepts connections but not index creation is not ready yet.
        search_provider
            .ensure_index_exists()
            .await
            .map_err(|e| ServiceError::config(format!("Failed to ensure index exists: {}", e)))?;

        Ok(search_provider)
    }

    /// Build the cache store. An unreachable Redis degrades to a process-local store,
    /// since cache failures never stop the service.
    async fn connect_cache(settings: &Settings) -> Arc<dyn CacheStore> {
        match settings.cache_backend {
            CacheBackend::Memory => {
                info!("Using in-memory cache store");
                Arc::new(InMemoryCacheStore::new())
            }
            CacheBackend::Redis => {
                match RedisCacheStore::connect(&settings.redis_url, settings.backend_timeout).await
                {
                    Ok(store) => {
                        info!(redis_url = %settings.redis_url, "Redis connection established");
                        Arc::new(store)
                    }
                    Err(e) => {
                        warn!(
                            redis_url = %settings.redis_url,
                            error = %e,
                            "Failed to connect to Redis, falling back to in-memory cache store"
                        );
                        Arc::new(InMemoryCacheStore::new())
                    }
                }
            }
        }
    }
}
