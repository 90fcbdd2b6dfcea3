//! Counters describing pipeline worker progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared pipeline counters.
///
/// Clones share the same counters, so a handle taken before `start` keeps
/// observing the running worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
    applied: Arc<AtomicU64>,
    dead_lettered: Arc<AtomicU64>,
    retries: Arc<AtomicU64>,
    committed: Arc<AtomicU64>,
}

/// A point-in-time copy of the worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Change events acknowledged by the index store.
    pub applied: u64,
    /// Records skipped after a permanent failure or an exhausted retry budget.
    pub dead_lettered: u64,
    /// Write attempts repeated after a transient failure.
    pub retries: u64,
    /// Offsets committed to the log.
    pub committed: u64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_letter(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retries(&self, count: u64) {
        self.retries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = WorkerMetrics::new();
        let observer = metrics.clone();

        metrics.record_applied();
        metrics.record_applied();
        metrics.record_dead_letter();
        metrics.record_retries(3);
        metrics.record_commit();

        assert_eq!(
            observer.snapshot(),
            MetricsSnapshot {
                applied: 2,
                dead_lettered: 1,
                retries: 3,
                committed: 1,
            }
        );
    }
}
