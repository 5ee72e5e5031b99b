//! Consumer module for the product search ingest.
//!
//! Provides Kafka consumer functionality for receiving catalog change events.

pub mod dead_letter;
mod kafka_config;
mod kafka_consumer;
mod messages;

pub use dead_letter::{DeadLetter, DeadLetterPolicy, DeadLetterSink, KafkaDeadLetterSink};
pub use kafka_config::KafkaConnection;
pub use kafka_consumer::{KafkaConsumer, KafkaConsumerConfig};
pub use messages::{ChangeKind, EventOffset, ProductEvent, StreamMessage};
