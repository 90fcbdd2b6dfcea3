//! Message types for the consumer.
//!
//! Defines the records read from the log and the change events decoded from them.

use std::fmt;

use review_indexer_shared::ReviewFields;

/// Position of a record in the log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl SourceOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for SourceOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.topic, self.partition, self.offset)
    }
}

/// One raw record read from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
}

impl LogRecord {
    /// The record's coordinates in the log.
    pub fn source(&self) -> SourceOffset {
        SourceOffset::new(self.topic.clone(), self.partition, self.offset)
    }
}

/// Kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A review was created; the payload is the full document.
    Create,
    /// A review was modified; the payload holds only the changed fields.
    Update,
    /// A review was removed; there is no payload.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A decoded create/update/delete mutation of a review.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub operation: Operation,
    /// The review id, also the index document id.
    pub key: i64,
    /// The review fields carried by the event (`None` for deletes).
    pub payload: Option<ReviewFields>,
    pub source: SourceOffset,
}

impl ChangeEvent {
    /// Create a new create or update event from a field set.
    pub fn with_fields(operation: Operation, fields: ReviewFields, source: SourceOffset) -> Self {
        Self {
            operation,
            key: fields.id,
            payload: match operation {
                Operation::Delete => None,
                Operation::Create | Operation::Update => Some(fields),
            },
            source,
        }
    }

    /// Create a new update event.
    pub fn update(fields: ReviewFields, source: SourceOffset) -> Self {
        Self::with_fields(Operation::Update, fields, source)
    }

    /// Create a new delete event.
    pub fn delete(review_id: i64, source: SourceOffset) -> Self {
        Self {
            operation: Operation::Delete,
            key: review_id,
            payload: None,
            source,
        }
    }

    /// The index document id targeted by this event.
    ///
    /// Taken from the payload when there is one, otherwise from the key.
    pub fn document_id(&self) -> String {
        match &self.payload {
            Some(fields) => fields.document_id(),
            None => self.key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_never_carries_payload() {
        let event = ChangeEvent::with_fields(
            Operation::Delete,
            ReviewFields::new(5),
            SourceOffset::new("review.changes", 0, 1),
        );
        assert_eq!(event.key, 5);
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_document_id_for_each_operation() {
        let source = SourceOffset::new("review.changes", 0, 1);

        let update = ChangeEvent::update(ReviewFields::new(17), source.clone());
        assert_eq!(update.document_id(), "17");

        let delete = ChangeEvent::delete(23, source);
        assert_eq!(delete.document_id(), "23");
    }

    #[test]
    fn test_source_display() {
        let source = SourceOffset::new("review.changes", 3, 42);
        assert_eq!(source.to_string(), "review.changes/3/42");
    }
}
