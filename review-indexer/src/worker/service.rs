//! Service trait implemented by long-running pipeline components.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::WorkerError;

/// A component with an explicit start/stop lifecycle.
#[async_trait]
pub trait Service: Send {
    /// Run until `token` is cancelled or an unrecoverable error occurs.
    ///
    /// Returns `Ok(())` on graceful cancellation.
    async fn start(&mut self, token: CancellationToken) -> Result<(), WorkerError>;

    /// Release every resource still held. Safe to call more than once.
    async fn stop(&mut self) -> Result<(), WorkerError>;
}
