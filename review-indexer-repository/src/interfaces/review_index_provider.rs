//! Review index provider trait definition.
//!
//! This module defines the abstract interface for index store operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::config::IndexConfig;
use crate::errors::IndexStoreError;
use crate::types::WriteResult;

/// Abstracts the underlying index store (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into the index writer to enable dependency
/// injection and easy testing with mock implementations. Every method returns
/// only after the store has acknowledged the request.
///
/// Document ids are always supplied by the caller; implementations must never
/// generate ids, so that replaying a write targets the same document.
#[async_trait]
pub trait ReviewIndexProvider: Send + Sync {
    /// Ensure the versioned index and its alias exist, creating them if necessary.
    ///
    /// This method should be called during application startup, before any
    /// document operation.
    async fn ensure_index(&self, config: &IndexConfig) -> Result<(), IndexStoreError>;

    /// Create or fully replace a document.
    ///
    /// # Arguments
    ///
    /// * `index` - The index or alias to write to
    /// * `doc_id` - The document id
    /// * `body` - The complete document body
    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        body: &Value,
    ) -> Result<WriteResult, IndexStoreError>;

    /// Merge fields into an existing document.
    ///
    /// Fields present in `partial_body` overwrite stored values; all other
    /// stored fields are left untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteResult)` - The store's result for the update
    /// * `Err(IndexStoreError::DocumentNotFound)` - If the document does not exist
    /// * `Err(IndexStoreError)` - If the update fails for any other reason
    async fn update_document(
        &self,
        index: &str,
        doc_id: &str,
        partial_body: &Value,
    ) -> Result<WriteResult, IndexStoreError>;

    /// Delete a document.
    ///
    /// A missing document is reported as `Ok(WriteResult::NotFound)`.
    async fn delete_document(&self, index: &str, doc_id: &str)
        -> Result<WriteResult, IndexStoreError>;

    /// Release the connection to the index store. Safe to call more than once.
    async fn close(&self) -> Result<(), IndexStoreError>;
}
