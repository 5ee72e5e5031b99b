//! Orchestrator module for the product search ingest.
//!
//! Coordinates the consumer and the processor: every event received from the consumer
//! is applied and then acknowledged, so the consumer only commits what was applied.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{EventOffset, ProductEvent, StreamMessage};
use crate::errors::IngestError;
use crate::processor::EventProcessor;

/// Source of change events driven by the orchestrator.
///
/// `run` sends `StreamMessage::Event`s and must wait for the matching
/// `StreamMessage::Acknowledgment` before committing or sending the next event. It
/// sends `StreamMessage::End` when it stops.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the configured topics.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Consume until the stream ends, the ack channel closes or `shutdown` fires.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// How often progress is logged.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Counters since startup.
#[derive(Debug, Default)]
struct IngestStats {
    events: AtomicU64,
    upserts: AtomicU64,
    deletes: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of the ingest counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStatsSnapshot {
    pub events_processed: u64,
    pub upserts: u64,
    pub deletes: u64,
    pub failures: u64,
}

impl IngestStats {
    fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            events_processed: self.events.load(Ordering::Relaxed),
            upserts: self.upserts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Makes sure the search index exists before consuming
/// - Applies events one at a time, in arrival order
/// - Acknowledges every event with its outcome
/// - Drains the in-flight event on shutdown
/// - Logs progress periodically
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: EventProcessor,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Set once shutdown is requested, so a request made before `run` is not lost.
    stop_requested: AtomicBool,
    stats: Arc<IngestStats>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(consumer: Arc<dyn Consumer>, processor: EventProcessor) -> Self {
        Self::with_config(consumer, processor, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: EventProcessor,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            config,
            shutdown_tx,
            stop_requested: AtomicBool::new(false),
            stats: Arc::new(IngestStats::default()),
        }
    }

    /// Counters since startup.
    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run the orchestrator.
    ///
    /// Blocks until the consumer stops, either because its stream ended or because a
    /// shutdown was requested (Ctrl-C or [`Orchestrator::shutdown`]). An event already
    /// handed over when shutdown is requested is still applied and acknowledged.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), IngestError> {
        info!("Starting product search orchestrator");

        let shutdown_rx = self.shutdown_tx.subscribe();
        if self.stop_requested.load(Ordering::SeqCst) {
            info!("Shutdown requested before start, not consuming");
            return Ok(());
        }

        self.processor.ensure_ready().await?;
        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        let consumer = Arc::clone(&self.consumer);
        let consumer_handle = tokio::spawn(async move {
            consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
        });

        info!("Ready to process events from Kafka");

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        progress_timer.tick().await;

        let mut prev_events: u64 = 0;
        let mut prev_time = tokio::time::Instant::now();
        let mut draining = false;

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Event { event, offset }) => {
                            let ack = self.handle_event(event, offset).await;
                            if ack_transmitter.send(ack).await.is_err() {
                                warn!("Consumer stopped before the acknowledgment was delivered");
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c(), if !draining => {
                    info!("Received shutdown signal, draining in-flight event");
                    draining = true;
                    self.shutdown();
                }
                _ = progress_timer.tick() => {
                    let stats = self.stats.snapshot();
                    let now = tokio::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let events_per_sec = if elapsed_secs > 0.0 {
                        (stats.events_processed.saturating_sub(prev_events) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        events_processed = stats.events_processed,
                        upserts = stats.upserts,
                        deletes = stats.deletes,
                        failures = stats.failures,
                        events_per_sec = format!("{:.2}", events_per_sec),
                        "Processing progress"
                    );

                    prev_events = stats.events_processed;
                    prev_time = now;
                }
            }
        }

        // A consumer still waiting for an acknowledgment sees the channel close.
        drop(ack_transmitter);
        drop(event_receiver);

        let consumer_result = consumer_handle
            .await
            .map_err(|e| IngestError::ChannelError(format!("Consumer task failed: {}", e)))?;

        let stats = self.stats.snapshot();
        info!(
            total_events_processed = stats.events_processed,
            total_upserts = stats.upserts,
            total_deletes = stats.deletes,
            total_failures = stats.failures,
            "Orchestrator shutdown complete"
        );

        consumer_result
    }

    /// Apply one event and build its acknowledgment.
    async fn handle_event(&self, event: ProductEvent, offset: EventOffset) -> StreamMessage {
        self.stats.events.fetch_add(1, Ordering::Relaxed);

        match self.processor.apply(&event).await {
            Ok(stage) => {
                let counter = match event {
                    ProductEvent::Upsert { .. } => &self.stats.upserts,
                    ProductEvent::Delete { .. } => &self.stats.deletes,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                debug!(
                    product_id = %event.product_id(),
                    offset = offset.offset,
                    stage = %stage,
                    "Event applied"
                );
                StreamMessage::Acknowledgment {
                    offset,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    product_id = %event.product_id(),
                    offset = offset.offset,
                    error = %e,
                    "Failed to process event. Sending NACK to consumer"
                );
                StreamMessage::Acknowledgment {
                    offset,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}
