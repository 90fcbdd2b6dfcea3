//! Log reader trait definition.
//!
//! The pipeline worker consumes the log only through this trait, so the Kafka
//! implementation can be swapped for a mock in tests.

use async_trait::async_trait;

use crate::consumer::messages::LogRecord;
use crate::errors::ConsumerError;

/// Pull-based access to a consumer-group managed log.
#[async_trait]
pub trait LogReader: Send {
    /// Join the consumer group and subscribe to the configured topics.
    fn subscribe(&mut self) -> Result<(), ConsumerError>;

    /// Wait for the next record.
    ///
    /// The returned future is raced against cancellation and dropped when the
    /// worker stops, so implementations must be cancel-safe: dropping the
    /// future before it completes must not lose a record.
    async fn read_record(&mut self) -> Result<LogRecord, ConsumerError>;

    /// Mark `offset` on `(topic, partition)` as processed.
    ///
    /// After a restart the group resumes from the record following the
    /// highest committed offset.
    async fn commit_offset(
        &mut self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<(), ConsumerError>;

    /// Leave the consumer group and release the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<(), ConsumerError>;
}
