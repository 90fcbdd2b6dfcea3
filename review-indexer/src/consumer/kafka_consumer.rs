//! Kafka log reader implementation for the review indexer.
//!
//! Reads review change records from a Kafka topic under a consumer group,
//! committing offsets manually once the pipeline has applied a record.

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::Message as KafkaMessage,
    Offset, TopicPartitionList,
};
use tracing::{debug, info, instrument};

use crate::consumer::log_reader::LogReader;
use crate::consumer::messages::LogRecord;
use crate::errors::ConsumerError;

/// Default upper bound on the bytes returned by a single fetch (10MB).
pub const DEFAULT_FETCH_MAX_BYTES: usize = 10_000_000;

/// Default session timeout for the consumer group, in milliseconds.
const DEFAULT_SESSION_TIMEOUT_MS: &str = "6000";

/// Kafka reader for review change records.
pub struct KafkaLogReader {
    /// `None` once the reader has been closed.
    consumer: Option<StreamConsumer>,
    topics: Vec<String>,
}

impl KafkaLogReader {
    /// Create a new Kafka log reader.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - The review change topic
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaLogReader)` - A new reader instance, not yet subscribed
    /// * `Err(ConsumerError)` - If consumer creation fails
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, ConsumerError> {
        Self::with_fetch_config(brokers, group_id, topic, DEFAULT_FETCH_MAX_BYTES)
    }

    /// Create a new Kafka log reader with a custom fetch size.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - The review change topic
    /// * `fetch_max_bytes` - Maximum bytes returned by a single fetch
    pub fn with_fetch_config(
        brokers: &str,
        group_id: &str,
        topic: &str,
        fetch_max_bytes: usize,
    ) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", DEFAULT_SESSION_TIMEOUT_MS)
            .set("fetch.max.bytes", fetch_max_bytes.to_string())
            .create()
            .map_err(|e| ConsumerError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topic = %topic,
            fetch_max_bytes = fetch_max_bytes,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer: Some(consumer),
            topics: vec![topic.to_string()],
        })
    }

    fn consumer(&self) -> Result<&StreamConsumer, ConsumerError> {
        self.consumer.as_ref().ok_or(ConsumerError::Closed)
    }
}

#[async_trait]
impl LogReader for KafkaLogReader {
    fn subscribe(&mut self) -> Result<(), ConsumerError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer()?
            .subscribe(&topics)
            .map_err(|e| ConsumerError::kafka(e.to_string()))?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// `StreamConsumer::recv` is cancel-safe: a message is only taken off the
    /// queue when the future resolves.
    async fn read_record(&mut self) -> Result<LogRecord, ConsumerError> {
        let msg = self.consumer()?.recv().await?;

        debug!(
            topic = %msg.topic(),
            partition = msg.partition(),
            offset = msg.offset(),
            "Received message from Kafka"
        );

        Ok(LogRecord {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(<[u8]>::to_vec),
            value: msg.payload().map(<[u8]>::to_vec),
        })
    }

    #[instrument(skip(self))]
    async fn commit_offset(
        &mut self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<(), ConsumerError> {
        // Kafka stores the next offset to read, not the last one processed.
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, Offset::Offset(offset + 1))
            .map_err(|e| ConsumerError::kafka(e.to_string()))?;

        self.consumer()?
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| ConsumerError::kafka(e.to_string()))?;

        debug!("Committed offset");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConsumerError> {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            // Dropping the consumer leaves the group and closes the connection.
            drop(consumer);
            info!(topics = ?self.topics, "Kafka consumer closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_FETCH_MAX_BYTES, 10_000_000);
        assert_eq!(DEFAULT_SESSION_TIMEOUT_MS, "6000");
    }

    #[tokio::test]
    async fn test_closed_reader_refuses_reads() {
        let mut reader =
            KafkaLogReader::new("localhost:9092", "review-indexer-test", "review.changes")
                .unwrap();

        reader.close().await.unwrap();
        reader.close().await.unwrap();

        assert_eq!(reader.read_record().await, Err(ConsumerError::Closed));
        assert_eq!(
            reader.commit_offset("review.changes", 0, 1).await,
            Err(ConsumerError::Closed)
        );
    }
}
