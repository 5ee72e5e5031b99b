//! # Product Search
//!
//! Read-optimized search layer for the product catalog. Consumes catalog change events
//! from Kafka, keeps OpenSearch, the cache and the in-memory indexes converging on the
//! same view, and serves search queries over HTTP.
//!
//! ## Architecture
//!
//! The write path follows the Consumer-Processor pattern:
//!
//! 1. **Consumer**: Receives change events from Kafka and commits their offsets
//! 2. **Processor**: Applies each event to the search engine, cache and indexes
//! 3. **Orchestrator**: Coordinates the ingest flow and acknowledges every event
//!
//! The read path is the [`query::QueryService`] behind the axum [`server`].
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`consumer`]: Kafka consumer, event decoding and dead-letter routing
//! - [`processor`]: Applies change events to every store
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`index`]: In-memory prefix and price indexes
//! - [`query`]: Search, autocomplete and lookup
//! - [`server`]: HTTP routes
//! - [`errors`]: Error types for the service

pub mod config;
pub mod consumer;
pub mod errors;
pub mod index;
pub mod orchestrator;
pub mod processor;
pub mod query;
pub mod server;

pub use config::{Dependencies, Settings};
pub use errors::{IngestError, QueryError};

use thiserror::Error;

/// Errors that can occur during service initialization or execution.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),

    /// The HTTP server failed.
    #[error("Server error: {0}")]
    ServerError(String),
}

impl ServiceError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a server error.
    pub fn server(msg: impl Into<String>) -> Self {
        Self::ServerError(msg.into())
    }
}
