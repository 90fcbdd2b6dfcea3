//! Worker module for the review indexer.
//!
//! Drives records from the log through the decoder and the index writer,
//! committing offsets only after the index store has acknowledged a write.

mod cursor;
mod metrics;
mod pipeline_worker;
mod service;

pub use cursor::CommitCursor;
pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use pipeline_worker::{
    PipelineWorker, RetryExhaustedPolicy, WorkerConfig, WorkerState, MIN_PROGRESS_INTERVAL,
};
pub use service::Service;
