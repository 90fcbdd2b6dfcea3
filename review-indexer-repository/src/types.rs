//! Result types for index store operations.

use std::fmt;

/// Outcome reported by the index store for a single document write.
///
/// Mirrors the `result` field of the OpenSearch/Elasticsearch document APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    /// A new document was created.
    Created,
    /// An existing document was replaced or merged.
    Updated,
    /// The document was deleted.
    Deleted,
    /// The document did not exist (only returned by deletes).
    NotFound,
    /// The write did not change the stored document.
    Noop,
}

impl WriteResult {
    /// Parse the `result` field of a document API response.
    pub fn from_result_field(result: &str) -> Option<Self> {
        match result {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            "not_found" => Some(Self::NotFound),
            "noop" => Some(Self::Noop),
            _ => None,
        }
    }

    /// The wire spelling of this result.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::NotFound => "not_found",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for WriteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
