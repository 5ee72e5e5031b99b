//! Dead-letter routing for payloads that cannot be decoded.
//!
//! A malformed message is published unchanged to a side topic so the partition can move
//! on. Publishing is retried a bounded number of times; if every attempt fails the caller
//! must not commit, so the message is retried later rather than dropped.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{info, warn};

use crate::consumer::kafka_config::KafkaConnection;
use crate::consumer::messages::EventOffset;
use crate::errors::IngestError;

/// Default number of publish attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay unit between publish attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Header names attached to every dead-lettered message.
pub const HEADER_SOURCE_TOPIC: &str = "x-source-topic";
pub const HEADER_SOURCE_PARTITION: &str = "x-source-partition";
pub const HEADER_SOURCE_OFFSET: &str = "x-source-offset";
pub const HEADER_ERROR: &str = "x-error";

/// A message that could not be processed, with where it came from and why.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub source: EventOffset,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    pub error: String,
}

/// Destination for dead-lettered messages.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Publish one message. Returns once the destination acknowledged it.
    async fn publish(&self, letter: &DeadLetter) -> Result<(), IngestError>;
}

/// Bounded retry for dead-letter publishing.
#[derive(Debug, Clone)]
pub struct DeadLetterPolicy {
    /// Total publish attempts, at least one.
    pub max_attempts: u32,
    /// Attempt `n` waits `n * retry_delay` before the next one.
    pub retry_delay: Duration,
}

impl Default for DeadLetterPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl DeadLetterPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

/// Publish `letter`, retrying with linear backoff.
///
/// Returns the last error once `policy.max_attempts` attempts have failed.
pub async fn publish_with_retry(
    sink: &dyn DeadLetterSink,
    letter: &DeadLetter,
    policy: &DeadLetterPolicy,
) -> Result<(), IngestError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match sink.publish(letter).await {
            Ok(()) => {
                info!(
                    topic = %letter.source.topic,
                    partition = letter.source.partition,
                    offset = letter.source.offset,
                    attempt,
                    "Routed malformed message to dead-letter topic"
                );
                return Ok(());
            }
            Err(e) if attempt >= max_attempts => {
                warn!(
                    offset = letter.source.offset,
                    attempts = attempt,
                    error = %e,
                    "Dead-letter publishing exhausted its attempts"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    offset = letter.source.offset,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Dead-letter publish failed, retrying"
                );
                tokio::time::sleep(policy.retry_delay * attempt).await;
                attempt += 1;
            }
        }
    }
}

/// `DeadLetterSink` publishing to a Kafka topic.
pub struct KafkaDeadLetterSink {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl KafkaDeadLetterSink {
    /// Create a producer for the dead-letter topic.
    ///
    /// # Arguments
    ///
    /// * `connection` - Kafka connection settings shared with the consumer
    /// * `topic` - Dead-letter topic name
    /// * `send_timeout` - Upper bound for one delivery
    pub fn new(
        connection: &KafkaConnection,
        topic: impl Into<String>,
        send_timeout: Duration,
    ) -> Result<Self, IngestError> {
        let producer: FutureProducer = connection
            .client_config()
            .set("client.id", "product-search-dlq")
            .set("compression.type", "zstd")
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        let topic = topic.into();
        info!(topic = %topic, "Created dead-letter producer");

        Ok(Self {
            producer,
            topic,
            send_timeout,
        })
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterSink {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), IngestError> {
        let partition = letter.source.partition.to_string();
        let offset = letter.source.offset.to_string();
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: HEADER_SOURCE_TOPIC,
                value: Some(letter.source.topic.as_str()),
            })
            .insert(Header {
                key: HEADER_SOURCE_PARTITION,
                value: Some(partition.as_str()),
            })
            .insert(Header {
                key: HEADER_SOURCE_OFFSET,
                value: Some(offset.as_str()),
            })
            .insert(Header {
                key: HEADER_ERROR,
                value: Some(letter.error.as_str()),
            });

        let mut record: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(&self.topic)
            .payload(letter.payload.as_slice())
            .headers(headers);
        if let Some(key) = &letter.key {
            record = record.key(key.as_slice());
        }

        self.producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map_err(|(e, _)| IngestError::dead_letter(e.to_string()))?;

        Ok(())
    }
}
