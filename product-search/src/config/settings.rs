//! Environment-driven settings for the product search service.

use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::consumer::dead_letter::DEFAULT_MAX_ATTEMPTS;

const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_OPENSEARCH_INDEX: &str = "products";
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";
const DEFAULT_KAFKA_GROUP_ID: &str = "search-service-group";
const DEFAULT_KAFKA_TOPIC: &str = "product-events";
const DEFAULT_DEAD_LETTER_TOPIC: &str = "product-events.dlq";
const DEFAULT_KAFKA_RETRY_BACKOFF_MS: u64 = 1000;
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_CACHE_QUERY_TTL_SECS: u64 = 600;
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5000;
const DEFAULT_SERVER_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
const DEFAULT_WARMUP_PAGE_SIZE: usize = 500;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection until successful.
    Retry,
}

impl ConnectionMode {
    /// Valid values: "fail-fast" or "retry" (case-insensitive). Anything else is `Retry`.
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("retry") => Self::Retry,
            Some("fail-fast" | "failfast" | "fail_fast") => Self::FailFast,
            Some(other) => {
                warn!(value = %other, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Which store backs the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    /// Process-local store for development and tests.
    Memory,
}

impl CacheBackend {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("redis") => Self::Redis,
            Some("memory" | "in-memory") => Self::Memory,
            Some(other) => {
                warn!(value = %other, "Invalid CACHE_BACKEND, defaulting to 'redis'");
                Self::Redis
            }
        }
    }
}

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub opensearch_index: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,

    pub kafka_broker: String,
    pub kafka_group_id: String,
    pub kafka_topic: String,
    pub dead_letter_topic: String,
    /// Pause before a failed event is redelivered.
    pub kafka_retry_backoff: Duration,
    pub dead_letter_max_attempts: u32,
    pub kafka_username: Option<String>,
    pub kafka_password: Option<String>,

    pub redis_url: String,
    pub cache_backend: CacheBackend,
    pub cache_query_ttl: Duration,

    /// Upper bound for every search engine, cache and broker call.
    pub backend_timeout: Duration,
    pub server_addr: SocketAddr,

    pub warmup_enabled: bool,
    pub warmup_page_size: usize,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_INDEX`: Index name (default: products)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: search-service-group)
    /// - `KAFKA_TOPIC`: Change event topic (default: product-events)
    /// - `KAFKA_DEAD_LETTER_TOPIC`: Dead-letter topic (default: product-events.dlq)
    /// - `KAFKA_RETRY_BACKOFF_MS`: Pause before redelivering a failed event (default: 1000)
    /// - `DEAD_LETTER_MAX_ATTEMPTS`: Dead-letter publish attempts (default: 3)
    /// - `KAFKA_USERNAME` / `KAFKA_PASSWORD`: Optional SASL credentials
    /// - `REDIS_URL`: Redis URL (default: redis://localhost:6379)
    /// - `CACHE_BACKEND`: "redis" or "memory" (default: redis)
    /// - `CACHE_QUERY_TTL_SECS`: Query-result cache TTL (default: 600)
    /// - `BACKEND_TIMEOUT_MS`: Timeout for backend calls (default: 5000)
    /// - `SERVER_ADDR`: HTTP listen address (default: 0.0.0.0:8080)
    /// - `WARMUP_ENABLED`: Rebuild in-memory indexes at startup (default: true)
    /// - `WARMUP_PAGE_SIZE`: Documents per rebuild page (default: 500)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Invalid values fall back to the
    /// default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            opensearch_url: text("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            opensearch_index: text("OPENSEARCH_INDEX", DEFAULT_OPENSEARCH_INDEX),
            connection_mode: ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),

            kafka_broker: text("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            kafka_group_id: text("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
            kafka_topic: text("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC),
            dead_letter_topic: text("KAFKA_DEAD_LETTER_TOPIC", DEFAULT_DEAD_LETTER_TOPIC),
            kafka_retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "KAFKA_RETRY_BACKOFF_MS",
                DEFAULT_KAFKA_RETRY_BACKOFF_MS,
            )),
            dead_letter_max_attempts: parse_or(
                &lookup,
                "DEAD_LETTER_MAX_ATTEMPTS",
                DEFAULT_MAX_ATTEMPTS,
            ),
            kafka_username: lookup("KAFKA_USERNAME").filter(|v| !v.is_empty()),
            kafka_password: lookup("KAFKA_PASSWORD").filter(|v| !v.is_empty()),

            redis_url: text("REDIS_URL", DEFAULT_REDIS_URL),
            cache_backend: CacheBackend::parse(lookup("CACHE_BACKEND").as_deref()),
            cache_query_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_QUERY_TTL_SECS",
                DEFAULT_CACHE_QUERY_TTL_SECS,
            )),

            backend_timeout: Duration::from_millis(parse_or(
                &lookup,
                "BACKEND_TIMEOUT_MS",
                DEFAULT_BACKEND_TIMEOUT_MS,
            )),
            server_addr: parse_or(&lookup, "SERVER_ADDR", DEFAULT_SERVER_ADDR),

            warmup_enabled: parse_flag(&lookup, "WARMUP_ENABLED", true),
            warmup_page_size: parse_or(&lookup, "WARMUP_PAGE_SIZE", DEFAULT_WARMUP_PAGE_SIZE),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key = %key, value = %raw, default = %default, "Invalid setting, using default");
            default
        }
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!(key = %key, value = %raw, default, "Invalid flag, using default");
            default
        }
    }
}
