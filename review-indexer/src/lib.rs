//! # Review Indexer
//!
//! Change-data-capture bridge for reviews - consumes review change records
//! from Kafka and applies them to an OpenSearch index.
//!
//! ## Architecture
//!
//! Records flow through a single worker, one at a time:
//!
//! 1. **Consumer**: Reads raw records from the log and commits offsets
//! 2. **Decoder**: Turns a record into a typed change event
//! 3. **Writer**: Applies the event to the index, idempotently by review id
//! 4. **Worker**: Retries transient failures and commits after acknowledgment
//! 5. **Lifecycle**: Cancels the worker on shutdown and releases its connections
//!
//! Offsets are committed only after the index store has acknowledged the
//! write, so delivery into the index is at-least-once.
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`consumer`]: Log reader seam and its Kafka implementation
//! - [`decoder`]: Change record decoding
//! - [`writer`]: Applies change events to the index
//! - [`worker`]: The pipeline worker and its counters
//! - [`lifecycle`]: Start/cancel/stop orchestration
//! - [`errors`]: Error types for the pipeline

pub mod config;
pub mod consumer;
pub mod decoder;
pub mod errors;
pub mod lifecycle;
pub mod worker;
pub mod writer;

pub use config::{Dependencies, Settings};
pub use errors::WorkerError;
pub use lifecycle::{shutdown_signal, LifecycleController};
pub use worker::{PipelineWorker, Service, WorkerConfig};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Worker error.
    #[error("Worker error: {0}")]
    WorkerError(#[from] WorkerError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
