//! Consumer module for the review indexer.
//!
//! Provides the log reader seam, its Kafka implementation, and the message
//! types that flow from the log into the pipeline.

mod kafka_consumer;
mod log_reader;
mod messages;

pub use kafka_consumer::{KafkaLogReader, DEFAULT_FETCH_MAX_BYTES};
pub use log_reader::LogReader;
pub use messages::{ChangeEvent, LogRecord, Operation, SourceOffset};
