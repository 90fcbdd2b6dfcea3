//! Dependency initialization and wiring for the review indexer.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::settings::{ConnectionMode, Settings};
use crate::consumer::KafkaLogReader;
use crate::worker::PipelineWorker;
use crate::IndexingError;
use review_indexer_repository::{IndexConfig, OpenSearchProvider, ReviewIndexProvider};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured worker ready to start.
    pub worker: PipelineWorker,
}

impl Dependencies {
    /// Initialize all dependencies from the given settings.
    ///
    /// Connects to OpenSearch (retrying according to the connection mode),
    /// makes sure the review index and alias exist, and creates the Kafka reader.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (OpenSearch only in fail-fast mode)
    pub async fn new(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            kafka_broker = %settings.kafka_broker,
            kafka_group_id = %settings.kafka_group_id,
            kafka_topic = %settings.kafka_topic,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let index_config = IndexConfig::new(settings.index_alias.clone(), settings.index_version);

        let provider = Self::connect_to_opensearch(
            &settings.opensearch_url,
            &index_config,
            settings.request_timeout,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!(index = %index_config.versioned_name(), "OpenSearch connection established");

        let reader = KafkaLogReader::with_fetch_config(
            &settings.kafka_broker,
            &settings.kafka_group_id,
            &settings.kafka_topic,
            settings.kafka_fetch_max_bytes,
        )
        .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        let worker = PipelineWorker::new(
            Box::new(reader),
            Arc::new(provider),
            settings.worker_config(),
        );

        Ok(Self { worker })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        index_config: &IndexConfig,
        request_timeout: Duration,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        loop {
            match Self::try_connect_opensearch(url, index_config, request_timeout).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => return Err(e),
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Create the provider and make sure the index exists, which is the first
    /// request that reaches the server.
    async fn try_connect_opensearch(
        url: &str,
        index_config: &IndexConfig,
        request_timeout: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        let provider = OpenSearchProvider::new(url, request_timeout).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
        })?;

        provider
            .ensure_index(index_config)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure index exists: {}", e)))?;

        Ok(provider)
    }
}
