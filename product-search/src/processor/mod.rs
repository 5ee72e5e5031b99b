//! Processor module for the product search ingest.
//!
//! Applies change events to the search engine, the cache and the in-memory indexes.

mod event_processor;

pub use event_processor::{ApplyStage, EventProcessor};
