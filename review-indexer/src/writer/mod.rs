//! Writer module for the review indexer.
//!
//! Applies decoded change events to the search index, one document at a time.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::consumer::{ChangeEvent, Operation};
use crate::errors::WriteError;
use review_indexer_repository::{IndexStoreError, ReviewIndexProvider, WriteResult};

/// Writer that applies change events to the review index.
///
/// Every write targets the review id as the document id, so replaying an event
/// converges on the same document:
/// - `Create` fully replaces the document
/// - `Update` merges the present fields into the stored document
/// - `Delete` removes the document; a missing document counts as deleted
pub struct IndexWriter {
    provider: Arc<dyn ReviewIndexProvider>,
    index: String,
}

impl IndexWriter {
    /// Create a new index writer.
    ///
    /// # Arguments
    ///
    /// * `provider` - The index store handle
    /// * `index` - The index or alias all documents are written to
    pub fn new(provider: Arc<dyn ReviewIndexProvider>, index: impl Into<String>) -> Self {
        Self {
            provider,
            index: index.into(),
        }
    }

    /// The index or alias this writer targets.
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Apply one change event.
    ///
    /// Returns only after the index store has acknowledged the write.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteResult)` - The store's result for the final write
    /// * `Err(WriteError::Transient)` - If the write may succeed when retried
    /// * `Err(WriteError::Rejected)` - If the write will fail again
    #[instrument(
        skip(self, event),
        fields(review_id = event.key, operation = %event.operation, source = %event.source)
    )]
    pub async fn apply(&self, event: ChangeEvent) -> Result<WriteResult, WriteError> {
        let review_id = event.key;
        let doc_id = event.document_id();

        let result = match event.operation {
            Operation::Create => {
                let body = Self::document_body(&event)?;
                self.provider
                    .index_document(&self.index, &doc_id, &body)
                    .await
                    .map_err(|e| WriteError::from_store(review_id, e))?
            }
            Operation::Update => {
                let body = Self::document_body(&event)?;
                match self
                    .provider
                    .update_document(&self.index, &doc_id, &body)
                    .await
                {
                    Ok(result) => result,
                    Err(e) if e.is_not_found() => self.upsert_missing(review_id, &doc_id, &body).await?,
                    Err(e) => return Err(WriteError::from_store(review_id, e)),
                }
            }
            Operation::Delete => {
                match self.provider.delete_document(&self.index, &doc_id).await {
                    Ok(result) => result,
                    Err(e) if e.is_not_found() => WriteResult::NotFound,
                    Err(e) => return Err(WriteError::from_store(review_id, e)),
                }
            }
        };

        debug!(result = %result, "Applied change event");
        Ok(result)
    }

    /// Release the index store connection.
    pub async fn close(&self) -> Result<(), IndexStoreError> {
        self.provider.close().await
    }

    /// Index an update whose target document does not exist yet.
    ///
    /// This happens when an update is replayed or reordered ahead of its create.
    /// The resulting document only holds the update's fields until a later full
    /// create or update fills in the rest.
    async fn upsert_missing(
        &self,
        review_id: i64,
        doc_id: &str,
        body: &Value,
    ) -> Result<WriteResult, WriteError> {
        warn!(
            review_id = review_id,
            index = %self.index,
            "Update for a missing document, indexing the available fields; document may be incomplete until reconciled"
        );

        self.provider
            .index_document(&self.index, doc_id, body)
            .await
            .map_err(|e| WriteError::from_store(review_id, e))
    }

    fn document_body(event: &ChangeEvent) -> Result<Value, WriteError> {
        let fields = event.payload.as_ref().ok_or_else(|| {
            WriteError::rejected(event.key, format!("{} event has no payload", event.operation))
        })?;

        serde_json::to_value(fields)
            .map_err(|e| WriteError::rejected(event.key, format!("Failed to serialize review: {}", e)))
    }
}
