//! Environment-driven settings for the review indexer.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::consumer::DEFAULT_FETCH_MAX_BYTES;
use crate::worker::{RetryExhaustedPolicy, WorkerConfig};

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "review-indexer";

/// Default topic carrying review change records.
const DEFAULT_KAFKA_TOPIC: &str = "review.changes";

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default index alias.
const DEFAULT_INDEX_ALIAS: &str = "reviews";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default per-request timeout for the index store, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection at a fixed interval until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Some(Self::FailFast),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

/// All settings the indexer reads at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub kafka_broker: String,
    pub kafka_group_id: String,
    pub kafka_topic: String,
    pub kafka_fetch_max_bytes: usize,
    pub opensearch_url: String,
    pub index_alias: String,
    pub index_version: u32,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub request_timeout: Duration,
    pub write_max_retries: usize,
    pub write_backoff_base_ms: u64,
    pub write_backoff_max: Duration,
    pub retry_exhausted_policy: RetryExhaustedPolicy,
    pub shutdown_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        let worker = WorkerConfig::default();

        Self {
            kafka_broker: DEFAULT_KAFKA_BROKER.to_string(),
            kafka_group_id: DEFAULT_KAFKA_GROUP_ID.to_string(),
            kafka_topic: DEFAULT_KAFKA_TOPIC.to_string(),
            kafka_fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            index_alias: DEFAULT_INDEX_ALIAS.to_string(),
            index_version: 0,
            connection_mode: ConnectionMode::Retry,
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            write_max_retries: worker.max_retries,
            write_backoff_base_ms: worker.backoff_base_ms,
            write_backoff_max: worker.backoff_max,
            retry_exhausted_policy: worker.exhausted_policy,
            shutdown_grace: worker.shutdown_grace,
        }
    }
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: review-indexer)
    /// - `KAFKA_TOPIC`: Review change topic (default: review.changes)
    /// - `KAFKA_FETCH_MAX_BYTES`: Maximum bytes per fetch (default: 10000000)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_ALIAS`: Index alias name (default: "reviews")
    /// - `REVIEWS_INDEX_VERSION`: Index version number (default: 0)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `OPENSEARCH_REQUEST_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)
    /// - `WRITE_MAX_RETRIES`: Retries for a transient write failure (default: 5)
    /// - `WRITE_BACKOFF_BASE_MS`: Backoff base in milliseconds (default: 10)
    /// - `WRITE_BACKOFF_MAX_MS`: Maximum backoff delay in milliseconds (default: 5000)
    /// - `RETRY_EXHAUSTED_POLICY`: "dead-letter" or "halt" (default: dead-letter)
    /// - `SHUTDOWN_GRACE_SECS`: Grace period for the in-flight write (default: 10)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let connection_mode = match lookup("OPENSEARCH_CONNECTION_MODE") {
            Some(value) => ConnectionMode::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                ConnectionMode::Retry
            }),
            None => defaults.connection_mode,
        };

        let retry_exhausted_policy = match lookup("RETRY_EXHAUSTED_POLICY") {
            Some(value) => RetryExhaustedPolicy::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Invalid RETRY_EXHAUSTED_POLICY, defaulting to 'dead-letter'");
                RetryExhaustedPolicy::DeadLetter
            }),
            None => defaults.retry_exhausted_policy,
        };

        Self {
            kafka_broker: lookup("KAFKA_BROKER").unwrap_or(defaults.kafka_broker),
            kafka_group_id: lookup("KAFKA_GROUP_ID").unwrap_or(defaults.kafka_group_id),
            kafka_topic: lookup("KAFKA_TOPIC").unwrap_or(defaults.kafka_topic),
            kafka_fetch_max_bytes: parse_or(
                &lookup,
                "KAFKA_FETCH_MAX_BYTES",
                defaults.kafka_fetch_max_bytes,
            ),
            opensearch_url: lookup("OPENSEARCH_URL").unwrap_or(defaults.opensearch_url),
            index_alias: lookup("INDEX_ALIAS").unwrap_or(defaults.index_alias),
            index_version: parse_or(&lookup, "REVIEWS_INDEX_VERSION", defaults.index_version),
            connection_mode,
            retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                defaults.retry_interval.as_secs(),
            )),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "OPENSEARCH_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            write_max_retries: parse_or(&lookup, "WRITE_MAX_RETRIES", defaults.write_max_retries),
            write_backoff_base_ms: parse_or(
                &lookup,
                "WRITE_BACKOFF_BASE_MS",
                defaults.write_backoff_base_ms,
            ),
            write_backoff_max: Duration::from_millis(parse_or(
                &lookup,
                "WRITE_BACKOFF_MAX_MS",
                defaults.write_backoff_max.as_millis() as u64,
            )),
            retry_exhausted_policy,
            shutdown_grace: Duration::from_secs(parse_or(
                &lookup,
                "SHUTDOWN_GRACE_SECS",
                defaults.shutdown_grace.as_secs(),
            )),
        }
    }

    /// The worker configuration these settings describe.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            index_name: self.index_alias.clone(),
            max_retries: self.write_max_retries,
            backoff_base_ms: self.write_backoff_base_ms,
            backoff_max: self.write_backoff_max,
            exhausted_policy: self.retry_exhausted_policy,
            shutdown_grace: self.shutdown_grace,
            ..WorkerConfig::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %value, "Invalid value, using default");
            default
        }),
        None => default,
    }
}
