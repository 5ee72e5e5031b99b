//! Error types for the product search service.

mod query_error;

use thiserror::Error;

pub use query_error::QueryError;

/// Errors that can occur in the ingest pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The search engine rejected or did not acknowledge a write.
    #[error("Search engine error: {0}")]
    EngineError(String),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// The payload could not be decoded into a change event.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A malformed payload could not be routed to the dead-letter topic.
    #[error("Dead-letter error: {0}")]
    DeadLetterError(String),
}

impl IngestError {
    /// Create a search engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::EngineError(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a dead-letter error.
    pub fn dead_letter(msg: impl Into<String>) -> Self {
        Self::DeadLetterError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

impl From<product_search_repository::SearchIndexError> for IngestError {
    fn from(err: product_search_repository::SearchIndexError) -> Self {
        Self::EngineError(err.to_string())
    }
}
