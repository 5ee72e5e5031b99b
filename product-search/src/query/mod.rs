//! Query module for the product search service.

mod service;

pub use service::{CacheClearReport, HealthReport, QueryService, DEFAULT_SUGGESTIONS};
