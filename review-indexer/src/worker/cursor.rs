//! Commit cursor tracking the last acknowledged offset per partition.

use std::collections::HashMap;

use crate::consumer::SourceOffset;

/// Per `(topic, partition)` high-water mark of committed offsets.
///
/// Offsets only move forward: a source at or behind the stored mark is refused.
#[derive(Debug, Default)]
pub struct CommitCursor {
    positions: HashMap<(String, i32), i64>,
}

impl CommitCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `source` is strictly ahead of the stored mark for its partition.
    pub fn is_ahead(&self, source: &SourceOffset) -> bool {
        match self.position(&source.topic, source.partition) {
            Some(current) => source.offset > current,
            None => true,
        }
    }

    /// Move the mark for `source`'s partition to `source.offset`.
    ///
    /// Returns `false` and leaves the cursor untouched when the offset is not
    /// strictly greater than the stored mark.
    pub fn advance(&mut self, source: &SourceOffset) -> bool {
        if !self.is_ahead(source) {
            return false;
        }
        self.positions
            .insert((source.topic.clone(), source.partition), source.offset);
        true
    }

    /// The last committed offset for a partition, if any.
    pub fn position(&self, topic: &str, partition: i32) -> Option<i64> {
        self.positions
            .get(&(topic.to_string(), partition))
            .copied()
    }
}
