//! Pipeline worker implementation.
//!
//! Fetches one record at a time, decodes it, applies it to the index with a
//! bounded retry budget, and commits the offset once the write is acknowledged.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{ChangeEvent, LogReader, LogRecord, SourceOffset};
use crate::decoder::ChangeEventDecoder;
use crate::errors::{WorkerError, WriteError};
use crate::worker::cursor::CommitCursor;
use crate::worker::metrics::{MetricsSnapshot, WorkerMetrics};
use crate::worker::service::Service;
use crate::writer::IndexWriter;
use review_indexer_repository::{ReviewIndexProvider, WriteResult};

/// Lifecycle state of a pipeline worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, not yet subscribed.
    Idle,
    /// Fetching and applying records.
    Running,
    /// Cancelled; finishing the in-flight record and closing connections.
    Draining,
    /// All connections closed.
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What the worker does with a record whose transient failures outlast the retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryExhaustedPolicy {
    /// Skip the record, count it as dead-lettered, and commit its offset.
    #[default]
    DeadLetter,
    /// Stop the worker without committing the record's offset.
    Halt,
}

impl RetryExhaustedPolicy {
    /// Parse a policy name (case-insensitive).
    ///
    /// Valid values: "dead-letter" or "halt"
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "dead-letter" | "deadletter" | "dead_letter" | "skip" => Some(Self::DeadLetter),
            "halt" | "stop" => Some(Self::Halt),
            _ => None,
        }
    }
}

/// Configuration for the pipeline worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Index or alias the writer targets.
    pub index_name: String,
    /// Retries after the first attempt for a transient write failure.
    pub max_retries: usize,
    /// Base of the exponential backoff, in milliseconds.
    pub backoff_base_ms: u64,
    /// Upper bound on a single backoff delay.
    pub backoff_max: Duration,
    pub exhausted_policy: RetryExhaustedPolicy,
    /// How long an in-flight write may run after cancellation.
    pub shutdown_grace: Duration,
    /// How often progress counters are logged. Values below
    /// [`MIN_PROGRESS_INTERVAL`] are raised to it.
    pub progress_interval: Duration,
}

/// Shortest period between two progress log lines.
pub const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            index_name: "reviews".to_string(),
            max_retries: 5,
            backoff_base_ms: 10,
            backoff_max: Duration::from_secs(5),
            exhausted_policy: RetryExhaustedPolicy::DeadLetter,
            shutdown_grace: Duration::from_secs(10),
            progress_interval: Duration::from_secs(10),
        }
    }
}

impl WorkerConfig {
    /// Create a configuration with default retry and shutdown settings.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Self::default()
        }
    }

    /// The progress logging period, never shorter than [`MIN_PROGRESS_INTERVAL`].
    pub fn progress_period(&self) -> Duration {
        self.progress_interval.max(MIN_PROGRESS_INTERVAL)
    }
}

/// Outcome of processing one record.
enum Disposition {
    /// The record is done with (applied or dead-lettered); its offset may be committed.
    Commit,
    /// The worker must stop without committing.
    Halt(WorkerError),
}

/// Decode and apply stage, borrowed independently of the log reader.
struct RecordHandler {
    decoder: ChangeEventDecoder,
    writer: IndexWriter,
    metrics: WorkerMetrics,
    config: WorkerConfig,
}

impl RecordHandler {
    async fn process(&self, record: LogRecord) -> Disposition {
        let source = record.source();

        let event = match self.decoder.decode_record(&record) {
            Ok(event) => event,
            Err(e) => {
                error!(
                    topic = %source.topic,
                    partition = source.partition,
                    offset = source.offset,
                    review_id = ?self.decoder.review_id_hint(&record),
                    error = %e,
                    "Failed to decode change record, skipping"
                );
                self.metrics.record_dead_letter();
                return Disposition::Commit;
            }
        };

        let review_id = event.key;
        let operation = event.operation;
        let (attempts, result) = self.apply_with_retry(&event).await;
        if attempts > 1 {
            self.metrics.record_retries(u64::from(attempts - 1));
        }

        match result {
            Ok(result) => {
                self.metrics.record_applied();
                debug!(
                    review_id = review_id,
                    operation = %operation,
                    result = %result,
                    attempts = attempts,
                    "Change event applied"
                );
                Disposition::Commit
            }
            Err(e @ WriteError::Rejected { .. }) => {
                error!(
                    topic = %source.topic,
                    partition = source.partition,
                    offset = source.offset,
                    review_id = review_id,
                    operation = %operation,
                    error = %e,
                    "Index store rejected change event, skipping"
                );
                self.metrics.record_dead_letter();
                Disposition::Commit
            }
            Err(e) => {
                error!(
                    topic = %source.topic,
                    partition = source.partition,
                    offset = source.offset,
                    review_id = review_id,
                    operation = %operation,
                    attempts = attempts,
                    policy = ?self.config.exhausted_policy,
                    error = %e,
                    "Retry budget exhausted for change event"
                );
                match self.config.exhausted_policy {
                    RetryExhaustedPolicy::DeadLetter => {
                        self.metrics.record_dead_letter();
                        Disposition::Commit
                    }
                    RetryExhaustedPolicy::Halt => Disposition::Halt(WorkerError::RetryExhausted {
                        attempts,
                        source: e,
                    }),
                }
            }
        }
    }

    /// Apply `event`, retrying transient failures with jittered exponential backoff.
    ///
    /// Returns the number of attempts made alongside the final result.
    async fn apply_with_retry(&self, event: &ChangeEvent) -> (u32, Result<WriteResult, WriteError>) {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.config.max_retries + 1;
        let writer = &self.writer;

        let strategy = ExponentialBackoff::from_millis(self.config.backoff_base_ms)
            .factor(2)
            .max_delay(self.config.backoff_max)
            .map(jitter)
            .take(self.config.max_retries);

        let result = RetryIf::spawn(
            strategy,
            || {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                let event = event.clone();
                async move {
                    let result = writer.apply(event).await;
                    if let Err(e) = &result {
                        if e.is_transient() {
                            warn!(
                                review_id = e.review_id(),
                                attempt = attempt,
                                max_attempts = max_attempts,
                                error = %e,
                                "Transient write failure"
                            );
                        }
                    }
                    result
                }
            },
            |e: &WriteError| e.is_transient(),
        )
        .await;

        (attempts.load(Ordering::Relaxed), result)
    }
}

/// Logs counter totals and rates since the previous report.
struct ProgressReporter {
    metrics: WorkerMetrics,
    previous: MetricsSnapshot,
    previous_time: Instant,
}

impl ProgressReporter {
    fn new(metrics: WorkerMetrics) -> Self {
        let previous = metrics.snapshot();
        Self {
            metrics,
            previous,
            previous_time: Instant::now(),
        }
    }

    fn report(&mut self) {
        let current = self.metrics.snapshot();
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.previous_time).as_secs_f64();

        let applied_per_sec = if elapsed_secs > 0.0 {
            (current.applied.saturating_sub(self.previous.applied) as f64) / elapsed_secs
        } else {
            0.0
        };

        info!(
            applied = current.applied,
            dead_lettered = current.dead_lettered,
            retries = current.retries,
            committed = current.committed,
            applied_per_sec = format!("{:.2}", applied_per_sec),
            "Processing progress"
        );

        self.previous = current;
        self.previous_time = now;
    }
}

/// Worker that moves review change records from the log into the index.
///
/// The worker:
/// - Owns the log reader and the commit cursor
/// - Processes records strictly one at a time
/// - Commits an offset only after its write is acknowledged or the record is dead-lettered
/// - Closes both connections on every exit path
pub struct PipelineWorker {
    reader: Box<dyn LogReader>,
    handler: RecordHandler,
    cursor: CommitCursor,
    state: WorkerState,
}

impl PipelineWorker {
    /// Create a new pipeline worker.
    ///
    /// # Arguments
    ///
    /// * `reader` - The log the worker consumes
    /// * `provider` - The index store change events are applied to
    /// * `config` - Retry, shutdown, and progress settings
    pub fn new(
        reader: Box<dyn LogReader>,
        provider: Arc<dyn ReviewIndexProvider>,
        config: WorkerConfig,
    ) -> Self {
        let writer = IndexWriter::new(provider, config.index_name.clone());

        Self {
            reader,
            handler: RecordHandler {
                decoder: ChangeEventDecoder::new(),
                writer,
                metrics: WorkerMetrics::new(),
                config,
            },
            cursor: CommitCursor::new(),
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// A handle on the worker's counters; it keeps observing after `start`.
    pub fn metrics(&self) -> WorkerMetrics {
        self.handler.metrics.clone()
    }

    pub fn cursor(&self) -> &CommitCursor {
        &self.cursor
    }

    async fn run_loop(&mut self, token: &CancellationToken) -> Result<(), WorkerError> {
        let mut progress = ProgressReporter::new(self.handler.metrics.clone());
        let mut progress_timer = interval(self.handler.config.progress_period());
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        progress_timer.reset();

        info!("Ready to process records from the log");

        loop {
            let record = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.state = WorkerState::Draining;
                    info!("Cancellation received, no further records will be fetched");
                    return Ok(());
                }
                record = self.reader.read_record() => match record {
                    Ok(record) => record,
                    Err(e) => {
                        error!(error = %e, "Failed to read from the log, stopping worker");
                        return Err(e.into());
                    }
                },
                _ = progress_timer.tick() => {
                    progress.report();
                    continue;
                }
            };

            self.handle_record(record, token).await?;
        }
    }

    #[instrument(
        skip(self, record, token),
        fields(topic = %record.topic, partition = record.partition, offset = record.offset)
    )]
    async fn handle_record(
        &mut self,
        record: LogRecord,
        token: &CancellationToken,
    ) -> Result<(), WorkerError> {
        let source = record.source();
        let grace = self.handler.config.shutdown_grace;

        let disposition = {
            let processing = self.handler.process(record);
            tokio::pin!(processing);

            tokio::select! {
                biased;
                disposition = &mut processing => disposition,
                _ = token.cancelled() => {
                    self.state = WorkerState::Draining;
                    info!(
                        grace_ms = grace.as_millis() as u64,
                        "Shutdown requested while applying a record, waiting for it to finish"
                    );
                    match timeout(grace, &mut processing).await {
                        Ok(disposition) => disposition,
                        Err(_) => {
                            warn!(
                                source = %source,
                                "Shutdown grace period elapsed, abandoning record without commit"
                            );
                            return Ok(());
                        }
                    }
                }
            }
        };

        match disposition {
            Disposition::Commit => {
                self.commit(&source).await;
                Ok(())
            }
            Disposition::Halt(e) => Err(e),
        }
    }

    /// Commit `source` if it is ahead of the cursor.
    ///
    /// A failed commit leaves the cursor where it was; the next successful
    /// commit on the partition covers this offset too.
    async fn commit(&mut self, source: &SourceOffset) {
        if !self.cursor.is_ahead(source) {
            warn!(
                source = %source,
                committed = ?self.cursor.position(&source.topic, source.partition),
                "Offset is not ahead of the commit cursor, skipping commit"
            );
            return;
        }

        match self
            .reader
            .commit_offset(&source.topic, source.partition, source.offset)
            .await
        {
            Ok(()) => {
                self.cursor.advance(source);
                self.handler.metrics.record_commit();
                debug!(source = %source, "Committed offset");
            }
            Err(e) => {
                error!(source = %source, error = %e, "Failed to commit offset, continuing");
            }
        }
    }

    /// Close the log and index store connections, reporting the first failure.
    async fn close_connections(&mut self) -> Result<(), WorkerError> {
        let reader_result = self.reader.close().await;
        if let Err(e) = &reader_result {
            error!(error = %e, "Failed to close log connection");
        }

        let writer_result = self.handler.writer.close().await;
        if let Err(e) = &writer_result {
            error!(error = %e, "Failed to close index store connection");
        }

        reader_result
            .map_err(WorkerError::from)
            .and(writer_result.map_err(WorkerError::from))
    }
}

#[async_trait]
impl Service for PipelineWorker {
    async fn start(&mut self, token: CancellationToken) -> Result<(), WorkerError> {
        if self.state != WorkerState::Idle {
            return Err(WorkerError::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        info!(
            index = %self.handler.writer.index_name(),
            max_retries = self.handler.config.max_retries,
            exhausted_policy = ?self.handler.config.exhausted_policy,
            "Starting pipeline worker"
        );

        let result = match self.reader.subscribe() {
            Ok(()) => {
                self.state = WorkerState::Running;
                self.run_loop(&token).await
            }
            Err(e) => {
                error!(error = %e, "Failed to subscribe to the log");
                Err(e.into())
            }
        };

        self.state = WorkerState::Draining;
        let close_result = self.close_connections().await;
        self.state = WorkerState::Stopped;

        let totals = self.handler.metrics.snapshot();
        info!(
            applied = totals.applied,
            dead_lettered = totals.dead_lettered,
            retries = totals.retries,
            committed = totals.committed,
            "Pipeline worker stopped"
        );

        result.and(close_result)
    }

    async fn stop(&mut self) -> Result<(), WorkerError> {
        if self.state == WorkerState::Stopped {
            debug!("Pipeline worker already stopped");
            return Ok(());
        }

        self.state = WorkerState::Draining;
        let result = self.close_connections().await;
        self.state = WorkerState::Stopped;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_state_display() {
        assert_eq!(WorkerState::Idle.to_string(), "idle");
        assert_eq!(WorkerState::Draining.to_string(), "draining");
        assert_eq!(
            WorkerError::InvalidState {
                action: "start",
                state: WorkerState::Stopped,
            }
            .to_string(),
            "Cannot start a worker that is stopped"
        );
    }

    #[test]
    fn test_retry_exhausted_policy_parse() {
        assert_eq!(
            RetryExhaustedPolicy::parse("dead-letter"),
            Some(RetryExhaustedPolicy::DeadLetter)
        );
        assert_eq!(
            RetryExhaustedPolicy::parse("HALT"),
            Some(RetryExhaustedPolicy::Halt)
        );
        assert_eq!(RetryExhaustedPolicy::parse("sometimes"), None);
        assert_eq!(
            RetryExhaustedPolicy::default(),
            RetryExhaustedPolicy::DeadLetter
        );
    }

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::new("reviews_test");
        assert_eq!(config.index_name, "reviews_test");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_ms, 10);
        assert_eq!(config.backoff_max, Duration::from_secs(5));
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
    }

    #[test]
    fn test_progress_period_has_a_floor() {
        let mut config = WorkerConfig::new("reviews_test");
        assert_eq!(config.progress_period(), Duration::from_secs(10));

        config.progress_interval = Duration::ZERO;
        assert_eq!(config.progress_period(), MIN_PROGRESS_INTERVAL);

        config.progress_interval = Duration::from_millis(250);
        assert_eq!(config.progress_period(), Duration::from_millis(250));
    }
}
