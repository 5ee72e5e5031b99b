//! Kafka consumer implementation for the product search service.
//!
//! Consumes catalog change events from Kafka and forwards them to the orchestrator one
//! at a time. The offset of an event is committed only after the orchestrator
//! acknowledges it; a failed event rewinds the partition so it is delivered again
//! without reordering.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::{
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{Message as _, OwnedMessage},
    Offset, TopicPartitionList,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::dead_letter::{
    publish_with_retry, DeadLetter, DeadLetterPolicy, DeadLetterSink,
};
use crate::consumer::kafka_config::KafkaConnection;
use crate::consumer::messages::{EventOffset, ProductEvent, StreamMessage};
use crate::errors::IngestError;
use crate::orchestrator::Consumer;
use crate::processor::ApplyStage;

/// Default topic carrying catalog change events.
pub const DEFAULT_TOPIC: &str = "product-events";

/// Default consumer group.
pub const DEFAULT_GROUP_ID: &str = "search-service-group";

/// Default pause after a failed event before it is redelivered.
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1000);

/// Upper bound for a partition seek.
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the Kafka consumer.
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    pub group_id: String,
    pub topics: Vec<String>,
    /// Pause after a failed event before it is redelivered.
    pub retry_backoff: Duration,
    pub dead_letter_policy: DeadLetterPolicy,
}

impl Default for KafkaConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            topics: vec![DEFAULT_TOPIC.to_string()],
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            dead_letter_policy: DeadLetterPolicy::default(),
        }
    }
}

/// Outcome of handing one Kafka message to the pipeline.
#[derive(Debug, PartialEq)]
enum Delivery {
    /// Move past the message.
    Commit(EventOffset),
    /// Deliver the message again after the backoff.
    Retry(EventOffset),
    /// The orchestrator is gone.
    Closed,
}

/// Kafka consumer for catalog change events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    config: KafkaConsumerConfig,
    dead_letters: Arc<dyn DeadLetterSink>,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `connection` - Kafka broker addresses and optional SASL credentials
    /// * `config` - Group, topics and retry settings
    /// * `dead_letters` - Destination for payloads that cannot be decoded
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(
        connection: &KafkaConnection,
        config: KafkaConsumerConfig,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = connection
            .client_config()
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %connection.brokers,
            group_id = %config.group_id,
            sasl = connection.uses_sasl(),
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            config,
            dead_letters,
        })
    }

    /// Commit the position after `offset`.
    fn commit(&self, offset: &EventOffset) -> Result<(), IngestError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &offset.topic,
            offset.partition,
            Offset::Offset(offset.offset + 1),
        )
        .map_err(|e| IngestError::kafka(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        debug!(
            topic = %offset.topic,
            partition = offset.partition,
            offset = offset.offset,
            stage = %ApplyStage::Committed,
            "Committed offset"
        );
        Ok(())
    }

    /// Move the partition back to `offset` so the message is fetched again.
    fn rewind(&self, offset: &EventOffset) -> Result<(), IngestError> {
        self.consumer
            .seek(
                &offset.topic,
                offset.partition,
                Offset::Offset(offset.offset),
                SEEK_TIMEOUT,
            )
            .map_err(|e| IngestError::kafka(e.to_string()))
    }

    /// Hand one message to the pipeline and wait for its outcome.
    async fn deliver(
        &self,
        msg: OwnedMessage,
        sender: &mpsc::Sender<StreamMessage>,
        ack_receiver: &mut mpsc::Receiver<StreamMessage>,
    ) -> Result<Delivery, IngestError> {
        let offset = EventOffset::new(msg.topic(), msg.partition(), msg.offset());

        let event = match intake(
            &offset,
            msg.key(),
            msg.payload(),
            self.dead_letters.as_ref(),
            &self.config.dead_letter_policy,
        )
        .await
        {
            Intake::Forward(event) => event,
            Intake::Settled(delivery) => return Ok(delivery),
        };

        debug!(
            product_id = %event.product_id(),
            kind = event.label(),
            offset = offset.offset,
            "Sending event to orchestrator"
        );

        sender
            .send(StreamMessage::Event {
                event,
                offset: offset.clone(),
            })
            .await
            .map_err(|e| IngestError::ChannelError(e.to_string()))?;

        Ok(await_ack(&offset, ack_receiver).await)
    }
}

/// A raw payload either becomes an event for the pipeline or is settled on the spot.
#[derive(Debug, PartialEq)]
enum Intake {
    Forward(ProductEvent),
    Settled(Delivery),
}

/// Decode a payload. Empty payloads are skipped; undecodable ones are dead-lettered and
/// skipped, or retried if the dead-letter topic cannot take them.
async fn intake(
    offset: &EventOffset,
    key: Option<&[u8]>,
    payload: Option<&[u8]>,
    dead_letters: &dyn DeadLetterSink,
    policy: &DeadLetterPolicy,
) -> Intake {
    let payload = match payload {
        Some(payload) if !payload.is_empty() => payload,
        _ => {
            debug!(offset = offset.offset, "Skipping message with empty payload");
            return Intake::Settled(Delivery::Commit(offset.clone()));
        }
    };

    let error = match ProductEvent::decode(payload) {
        Ok(event) => return Intake::Forward(event),
        Err(e) => e,
    };

    warn!(
        topic = %offset.topic,
        partition = offset.partition,
        offset = offset.offset,
        error = %error,
        "Failed to decode message"
    );
    let letter = DeadLetter {
        source: offset.clone(),
        key: key.map(<[u8]>::to_vec),
        payload: payload.to_vec(),
        error: error.to_string(),
    };

    match publish_with_retry(dead_letters, &letter, policy).await {
        Ok(()) => Intake::Settled(Delivery::Commit(offset.clone())),
        Err(_) => Intake::Settled(Delivery::Retry(offset.clone())),
    }
}

/// Wait for the acknowledgment of `offset`, ignoring acknowledgments of other offsets.
async fn await_ack(
    offset: &EventOffset,
    ack_receiver: &mut mpsc::Receiver<StreamMessage>,
) -> Delivery {
    loop {
        match ack_receiver.recv().await {
            Some(StreamMessage::Acknowledgment {
                offset: acked,
                success,
                error,
            }) => {
                if acked != *offset {
                    warn!(
                        expected = offset.offset,
                        received = acked.offset,
                        "Ignoring acknowledgment for another offset"
                    );
                    continue;
                }
                if success {
                    return Delivery::Commit(acked);
                }
                error!(
                    offset = acked.offset,
                    error = error.as_deref().unwrap_or("Unknown error"),
                    "Not committing offset due to processing failure"
                );
                return Delivery::Retry(acked);
            }
            Some(StreamMessage::End) | None => return Delivery::Closed,
            Some(_) => {}
        }
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.config.topics.iter().map(|s| s.as_str()).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topics = ?self.config.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// Start consuming messages and send them through the channel, one at a time.
    ///
    /// A shutdown signal stops the intake of new messages; an event already handed to
    /// the orchestrator is still acknowledged and committed first.
    #[instrument(skip_all)]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        let mut message_stream = self.consumer.stream();

        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                message = message_stream.next() => message,
            };

            let msg = match message {
                Some(Ok(msg)) => msg.detach(),
                Some(Err(e)) => {
                    error!(error = %e, "Kafka error");
                    let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                    continue;
                }
                None => {
                    info!("Kafka stream ended");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
            };

            match self.deliver(msg, &sender, &mut ack_receiver).await? {
                Delivery::Commit(offset) => {
                    if let Err(e) = self.commit(&offset) {
                        error!(offset = offset.offset, error = %e, "Failed to commit offset");
                    }
                }
                Delivery::Retry(offset) => {
                    if let Err(e) = self.rewind(&offset) {
                        error!(offset = offset.offset, error = %e, "Failed to rewind partition");
                    }
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Delivery::Closed => {
                    info!("Acknowledgment channel closed");
                    break;
                }
            }
        }

        Ok(())
    }
}
