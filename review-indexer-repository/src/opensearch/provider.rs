//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `ReviewIndexProvider`
//! using the OpenSearch Rust crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsAliasParts},
    DeleteParts, IndexParts, OpenSearch, UpdateParts,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::IndexConfig;
use crate::errors::IndexStoreError;
use crate::interfaces::ReviewIndexProvider;
use crate::opensearch::mappings::get_index_body;
use crate::types::WriteResult;

/// Number of times OpenSearch retries a partial update internally on a version conflict.
const RETRY_ON_CONFLICT: i64 = 3;

/// The `result` field shared by the index, update, and delete responses.
#[derive(Debug, Deserialize)]
struct DocumentResponse {
    result: String,
}

/// Document API that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentOperation {
    Index,
    Update,
    Delete,
}

impl DocumentOperation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// The result implied by a success status alone.
    fn result_for_status(self, status: u16) -> WriteResult {
        match (self, status) {
            (Self::Delete, _) => WriteResult::Deleted,
            (_, 201) => WriteResult::Created,
            _ => WriteResult::Updated,
        }
    }
}

/// Turn the status and body of a document API response into a `WriteResult`.
///
/// - 2xx: the `result` field, or the result implied by the status when the body
///   cannot be read; the store has acknowledged the write either way
/// - 404 with `"result": "not_found"`: `WriteResult::NotFound` (deletes)
/// - any other failure: classified by [`IndexStoreError::from_status`]
fn classify(
    operation: DocumentOperation,
    status: u16,
    doc_id: &str,
    body: &str,
) -> Result<WriteResult, IndexStoreError> {
    let parsed = serde_json::from_str::<DocumentResponse>(body).ok();

    if (200..300).contains(&status) {
        let result = parsed
            .as_ref()
            .and_then(|response| WriteResult::from_result_field(&response.result));
        return Ok(result.unwrap_or_else(|| {
            let fallback = operation.result_for_status(status);
            warn!(
                operation = operation.as_str(),
                doc_id = %doc_id,
                status = status,
                result = ?parsed.map(|response| response.result),
                fallback = %fallback,
                "Unrecognized result in acknowledged response, using the status"
            );
            fallback
        }));
    }

    if status == 404 {
        if let Some(response) = &parsed {
            if response.result == WriteResult::NotFound.as_str() {
                return Ok(WriteResult::NotFound);
            }
        }
    }

    Err(IndexStoreError::from_status(status, doc_id, body))
}

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use review_indexer_repository::{IndexConfig, OpenSearchProvider, ReviewIndexProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", Duration::from_secs(30))?;
/// provider.ensure_index(&IndexConfig::new("reviews", 0)).await?;
/// provider
///     .index_document("reviews", "1", &serde_json::json!({"id": 1, "score": 5}))
///     .await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    closed: AtomicBool,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `request_timeout` - Upper bound on a single request, including the acknowledgment
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(IndexStoreError)` - If the URL is invalid or the transport cannot be built
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, IndexStoreError> {
        let parsed_url = Url::parse(url).map_err(|e| IndexStoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(request_timeout)
            .build()
            .map_err(|e| IndexStoreError::connection(e.to_string()))?;

        info!(
            url = %url,
            request_timeout_ms = request_timeout.as_millis() as u64,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), IndexStoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexStoreError::Closed);
        }
        Ok(())
    }

    /// Read a document API response and classify it.
    async fn read_document_response(
        response: Response,
        doc_id: &str,
        operation: DocumentOperation,
    ) -> Result<WriteResult, IndexStoreError> {
        let status = response.status_code().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IndexStoreError::connection(e.to_string()))?;

        let result = classify(operation, status, doc_id, &body);
        if let Err(e) = &result {
            if !e.is_not_found() {
                error!(
                    operation = operation.as_str(),
                    doc_id = %doc_id,
                    status = status,
                    body = %body,
                    "Document request failed"
                );
            }
        }
        result
    }

    fn transport_error(e: opensearch::Error) -> IndexStoreError {
        IndexStoreError::connection(e.to_string())
    }
}

#[async_trait]
impl ReviewIndexProvider for OpenSearchProvider {
    /// Ensure the versioned index and its alias exist.
    ///
    /// If the alias already resolves, nothing is changed. Otherwise the index
    /// `{alias}_v{version}` is created with the review mappings and the alias attached.
    async fn ensure_index(&self, config: &IndexConfig) -> Result<(), IndexStoreError> {
        self.ensure_open()?;

        let alias = config.alias.as_str();
        let exists = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if exists.status_code().is_success() {
            info!(alias = %alias, "Index alias already exists");
            return Ok(());
        }

        let index_name = config.versioned_name();
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(get_index_body(config))
            .send()
            .await
            .map_err(|e| IndexStoreError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Another instance may have created it between the check and the create.
            if body.contains("resource_already_exists_exception") {
                warn!(index = %index_name, "Index was created concurrently");
                return Ok(());
            }
            error!(index = %index_name, status = %status, body = %body, "Index creation failed");
            return Err(IndexStoreError::index_creation(format!(
                "Creating {} failed with status {}: {}",
                index_name, status, body
            )));
        }

        info!(index = %index_name, alias = %alias, "Created review index");
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        body: &Value,
    ) -> Result<WriteResult, IndexStoreError> {
        self.ensure_open()?;

        let response = self
            .client
            .index(IndexParts::IndexId(index, doc_id))
            .body(body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let result = Self::read_document_response(response, doc_id, DocumentOperation::Index).await?;
        debug!(index = %index, doc_id = %doc_id, result = %result, "Document indexed");
        Ok(result)
    }

    async fn update_document(
        &self,
        index: &str,
        doc_id: &str,
        partial_body: &Value,
    ) -> Result<WriteResult, IndexStoreError> {
        self.ensure_open()?;

        // No `doc_as_upsert`: a missing document must surface as a 404 so the
        // caller can decide how to reconcile it.
        let response = self
            .client
            .update(UpdateParts::IndexId(index, doc_id))
            .retry_on_conflict(RETRY_ON_CONFLICT)
            .body(json!({ "doc": partial_body }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let result = Self::read_document_response(response, doc_id, DocumentOperation::Update).await?;
        debug!(index = %index, doc_id = %doc_id, result = %result, "Document updated");
        Ok(result)
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_id: &str,
    ) -> Result<WriteResult, IndexStoreError> {
        self.ensure_open()?;

        let response = self
            .client
            .delete(DeleteParts::IndexId(index, doc_id))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let result = Self::read_document_response(response, doc_id, DocumentOperation::Delete).await?;
        debug!(index = %index, doc_id = %doc_id, result = %result, "Document deleted");
        Ok(result)
    }

    async fn close(&self) -> Result<(), IndexStoreError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("OpenSearch provider closed");
        }
        Ok(())
    }
}
