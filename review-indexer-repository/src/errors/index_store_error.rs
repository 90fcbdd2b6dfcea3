//! Index store error types.
//!
//! This module defines the unified error type for all index store operations
//! and the classification of each failure as transient or permanent.

use thiserror::Error;

/// Maximum number of response body bytes kept in an error message.
const MAX_BODY_LEN: usize = 512;

/// Error type reported when the target index (not the document) is missing.
const INDEX_NOT_FOUND: &str = "index_not_found_exception";

/// Unified errors from index store operations.
///
/// Used by the `ReviewIndexProvider` trait for every document operation. Callers
/// decide whether to retry with [`IndexStoreError::is_transient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexStoreError {
    /// Failed to reach the index store, or the request timed out in transit.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The index store answered with a retriable status (408, 429, 5xx).
    #[error("Index store unavailable (status {status}): {body}")]
    Unavailable { status: u16, body: String },

    /// A concurrent write to the same document won the race.
    #[error("Version conflict on document {doc_id}")]
    VersionConflict { doc_id: String },

    /// The index store refused the request (malformed document, mapping conflict).
    #[error("Request rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The target document does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Failed to create the index or its alias.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// The provider was used after `close`.
    #[error("Index store connection is closed")]
    Closed,
}

impl IndexStoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a document not found error.
    pub fn document_not_found(doc_id: impl Into<String>) -> Self {
        Self::DocumentNotFound(doc_id.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Classify a non-success HTTP response from a document API.
    ///
    /// # Arguments
    ///
    /// * `status` - The HTTP status code
    /// * `doc_id` - The document the request targeted
    /// * `body` - The response body, truncated before being stored
    ///
    /// A 404 caused by a missing index is a rejection, not a missing document.
    pub fn from_status(status: u16, doc_id: &str, body: &str) -> Self {
        if status == 404 && body.contains(INDEX_NOT_FOUND) {
            return Self::Rejected {
                status,
                body: truncate_body(body),
            };
        }
        let body = truncate_body(body);
        match status {
            404 => Self::DocumentNotFound(doc_id.to_string()),
            409 => Self::VersionConflict {
                doc_id: doc_id.to_string(),
            },
            408 | 429 | 500..=599 => Self::Unavailable { status, body },
            _ => Self::Rejected { status, body },
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_) | Self::Unavailable { .. } | Self::VersionConflict { .. }
        )
    }

    /// Whether the error reports a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_))
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
