//! Test doubles for the log and the index store.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use review_indexer::consumer::{LogReader, LogRecord, SourceOffset};
use review_indexer::errors::ConsumerError;
use review_indexer::worker::{RetryExhaustedPolicy, WorkerConfig};
use review_indexer_repository::{IndexConfig, IndexStoreError, ReviewIndexProvider, WriteResult};

pub const TOPIC: &str = "review.changes";

/// Ordered record of writes and commits across both doubles.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct LogState {
    subscribed: bool,
    closed: bool,
    commits: Vec<SourceOffset>,
    fail_subscribe: bool,
    failing_commits: usize,
}

/// Log reader fed from a fixed queue.
///
/// Once the queue is drained, `read_record` fires the idle notification and
/// blocks forever, like a consumer waiting on an empty partition.
pub struct MockLogReader {
    records: VecDeque<Result<LogRecord, ConsumerError>>,
    state: Arc<Mutex<LogState>>,
    idle: Arc<Notify>,
    journal: Journal,
}

/// Observer for a `MockLogReader` after it has been moved into a worker.
#[derive(Clone)]
pub struct LogHandle {
    state: Arc<Mutex<LogState>>,
    idle: Arc<Notify>,
}

impl MockLogReader {
    pub fn new(records: Vec<LogRecord>, journal: Journal) -> (Self, LogHandle) {
        Self::with_results(records.into_iter().map(Ok).collect(), journal)
    }

    pub fn with_results(
        records: Vec<Result<LogRecord, ConsumerError>>,
        journal: Journal,
    ) -> (Self, LogHandle) {
        let state = Arc::new(Mutex::new(LogState::default()));
        let idle = Arc::new(Notify::new());
        let handle = LogHandle {
            state: state.clone(),
            idle: idle.clone(),
        };
        (
            Self {
                records: records.into(),
                state,
                idle,
                journal,
            },
            handle,
        )
    }

    pub fn fail_subscribe(self) -> Self {
        self.state.lock().unwrap().fail_subscribe = true;
        self
    }

    pub fn fail_commits(self, count: usize) -> Self {
        self.state.lock().unwrap().failing_commits = count;
        self
    }

    fn ensure_open(&self) -> Result<(), ConsumerError> {
        if self.state.lock().unwrap().closed {
            return Err(ConsumerError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl LogReader for MockLogReader {
    fn subscribe(&mut self) -> Result<(), ConsumerError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe {
            return Err(ConsumerError::kafka("subscription refused"));
        }
        state.subscribed = true;
        Ok(())
    }

    async fn read_record(&mut self) -> Result<LogRecord, ConsumerError> {
        self.ensure_open()?;
        match self.records.pop_front() {
            Some(result) => result,
            None => {
                self.idle.notify_one();
                std::future::pending().await
            }
        }
    }

    async fn commit_offset(
        &mut self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<(), ConsumerError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(ConsumerError::kafka("commit timed out"));
        }
        state
            .commits
            .push(SourceOffset::new(topic, partition, offset));
        self.journal.push(format!("commit:{}", offset));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConsumerError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

impl LogHandle {
    pub fn committed_offsets(&self) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .commits
            .iter()
            .map(|c| c.offset)
            .collect()
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().unwrap().subscribed
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Wait until the reader has handed out every queued record.
    pub async fn wait_idle(&self) {
        self.idle.notified().await;
    }
}

#[derive(Default)]
struct StoreData {
    documents: HashMap<String, Map<String, Value>>,
    failures: VecDeque<IndexStoreError>,
    write_delay: Duration,
}

/// Index store backed by a map, with merge-on-update semantics.
pub struct InMemoryIndexStore {
    data: Arc<Mutex<StoreData>>,
    closed: AtomicBool,
    write_started: Arc<Notify>,
    journal: Journal,
}

impl InMemoryIndexStore {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            data: Arc::new(Mutex::new(StoreData::default())),
            closed: AtomicBool::new(false),
            write_started: Arc::new(Notify::new()),
            journal,
        })
    }

    /// A fresh connection to the same documents.
    pub fn reconnect(&self) -> Arc<Self> {
        Arc::new(Self {
            data: self.data.clone(),
            closed: AtomicBool::new(false),
            write_started: self.write_started.clone(),
            journal: self.journal.clone(),
        })
    }

    /// Fail the next `count` writes with `error`.
    pub fn fail_next(&self, count: usize, error: IndexStoreError) {
        let mut data = self.data.lock().unwrap();
        for _ in 0..count {
            data.failures.push_back(error.clone());
        }
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.data.lock().unwrap().write_delay = delay;
    }

    pub fn document(&self, doc_id: &str) -> Option<Map<String, Value>> {
        self.data.lock().unwrap().documents.get(doc_id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.data.lock().unwrap().documents.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait until a write request reaches the store.
    pub async fn wait_write_started(&self) {
        self.write_started.notified().await;
    }

    async fn begin_write(&self) -> Result<(), IndexStoreError> {
        if self.is_closed() {
            return Err(IndexStoreError::Closed);
        }
        self.write_started.notify_one();

        let delay = self.data.lock().unwrap().write_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.data.lock().unwrap().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReviewIndexProvider for InMemoryIndexStore {
    async fn ensure_index(&self, _config: &IndexConfig) -> Result<(), IndexStoreError> {
        Ok(())
    }

    async fn index_document(
        &self,
        _index: &str,
        doc_id: &str,
        body: &Value,
    ) -> Result<WriteResult, IndexStoreError> {
        self.begin_write().await?;
        let body = body.as_object().cloned().unwrap_or_default();
        let previous = self
            .data
            .lock()
            .unwrap()
            .documents
            .insert(doc_id.to_string(), body);
        self.journal.push(format!("write:{}", doc_id));
        Ok(if previous.is_some() {
            WriteResult::Updated
        } else {
            WriteResult::Created
        })
    }

    async fn update_document(
        &self,
        _index: &str,
        doc_id: &str,
        partial_body: &Value,
    ) -> Result<WriteResult, IndexStoreError> {
        self.begin_write().await?;
        {
            let mut data = self.data.lock().unwrap();
            let document = data
                .documents
                .get_mut(doc_id)
                .ok_or_else(|| IndexStoreError::document_not_found(doc_id))?;
            for (key, value) in partial_body.as_object().cloned().unwrap_or_default() {
                document.insert(key, value);
            }
        }
        self.journal.push(format!("write:{}", doc_id));
        Ok(WriteResult::Updated)
    }

    async fn delete_document(
        &self,
        _index: &str,
        doc_id: &str,
    ) -> Result<WriteResult, IndexStoreError> {
        self.begin_write().await?;
        let removed = self.data.lock().unwrap().documents.remove(doc_id);
        self.journal.push(format!("write:{}", doc_id));
        Ok(match removed {
            Some(_) => WriteResult::Deleted,
            None => WriteResult::NotFound,
        })
    }

    async fn close(&self) -> Result<(), IndexStoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Worker settings with millisecond backoffs.
pub fn fast_config() -> WorkerConfig {
    WorkerConfig {
        max_retries: 3,
        backoff_base_ms: 1,
        backoff_max: Duration::from_millis(5),
        exhausted_policy: RetryExhaustedPolicy::DeadLetter,
        shutdown_grace: Duration::from_secs(2),
        ..WorkerConfig::new("reviews")
    }
}

pub fn raw_record(offset: i64, key: Option<&str>, value: &[u8]) -> LogRecord {
    LogRecord {
        topic: TOPIC.to_string(),
        partition: 0,
        offset,
        key: key.map(|k| k.as_bytes().to_vec()),
        value: Some(value.to_vec()),
    }
}

pub fn json_record(offset: i64, id: i64, value: Value) -> LogRecord {
    raw_record(offset, Some(&id.to_string()), value.to_string().as_bytes())
}

pub fn create_record(offset: i64, id: i64, score: i32, content: &str) -> LogRecord {
    json_record(
        offset,
        id,
        json!({
            "version": 1,
            "op": "create",
            "id": id,
            "data": {
                "user_id": 1001,
                "score": score,
                "content": content,
                "tags": [],
                "status": 2,
                "publish_time": "2024-05-01T08:00:00Z"
            }
        }),
    )
}

pub fn update_record(offset: i64, id: i64, data: Value) -> LogRecord {
    json_record(
        offset,
        id,
        json!({ "version": 1, "op": "update", "id": id, "data": data }),
    )
}

pub fn delete_record(offset: i64, id: i64) -> LogRecord {
    json_record(offset, id, json!({ "version": 1, "op": "delete", "id": id }))
}
