//! Error types for the review indexer pipeline.

use thiserror::Error;

use crate::worker::WorkerState;
use review_indexer_repository::IndexStoreError;

/// Errors raised by the log reader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// The reader was used after `close`.
    #[error("Log connection is closed")]
    Closed,
}

impl ConsumerError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for ConsumerError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

/// Errors raised while decoding a raw log record into a change event.
///
/// Every variant is permanent for the record that produced it: decoding the
/// same bytes again cannot succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload could not be parsed into the change record schema.
    #[error("Malformed change record: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The operation marker is not recognized.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The envelope version is not supported.
    #[error("Unsupported change record version: {0}")]
    UnsupportedVersion(u32),

    /// The record key and the payload disagree on the review id.
    #[error("Record key {key} does not match review id {review_id}")]
    KeyMismatch { key: i64, review_id: i64 },
}

impl DecodeError {
    /// Create a malformed record error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Errors raised while applying a change event to the index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Temporary failure; the same write may succeed if retried.
    #[error("Transient write error for review {review_id}: {source}")]
    Transient {
        review_id: i64,
        source: IndexStoreError,
    },

    /// Permanent failure; the write will deterministically fail again.
    #[error("Rejected write for review {review_id}: {reason}")]
    Rejected { review_id: i64, reason: String },
}

impl WriteError {
    /// Classify an index store error for the given review.
    pub fn from_store(review_id: i64, err: IndexStoreError) -> Self {
        if err.is_transient() {
            Self::Transient {
                review_id,
                source: err,
            }
        } else {
            Self::Rejected {
                review_id,
                reason: err.to_string(),
            }
        }
    }

    /// Create a rejected write error.
    pub fn rejected(review_id: i64, reason: impl Into<String>) -> Self {
        Self::Rejected {
            review_id,
            reason: reason.into(),
        }
    }

    /// Whether the caller should retry the write.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The review the failed write targeted.
    pub fn review_id(&self) -> i64 {
        match self {
            Self::Transient { review_id, .. } | Self::Rejected { review_id, .. } => *review_id,
        }
    }
}

/// Errors that stop the pipeline worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Unrecoverable log failure (subscribe, read, or close).
    #[error("Consumer error: {0}")]
    ConsumerError(#[from] ConsumerError),

    /// Failure releasing the index store connection.
    #[error("Index store error: {0}")]
    IndexStoreError(#[from] IndexStoreError),

    /// A lifecycle method was called in the wrong state.
    #[error("Cannot {action} a worker that is {state}")]
    InvalidState {
        action: &'static str,
        state: WorkerState,
    },

    /// A transient write kept failing and the worker is configured to halt.
    #[error("Retry budget exhausted after {attempts} attempts: {source}")]
    RetryExhausted { attempts: u32, source: WriteError },
}
