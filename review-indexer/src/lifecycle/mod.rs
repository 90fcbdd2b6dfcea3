//! Lifecycle module for the review indexer.
//!
//! Starts a service, cancels it when the shutdown signal fires, and releases
//! its resources afterwards.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::WorkerError;
use crate::worker::Service;

/// Controller that owns the cancellation token of a running service.
#[derive(Debug, Clone, Default)]
pub struct LifecycleController {
    token: CancellationToken,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the controller's token; cancelling it stops the service.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run `service` until it exits or `shutdown` resolves.
    ///
    /// When `shutdown` resolves first the token is cancelled and the service is
    /// awaited until it has drained. `stop` is always called afterwards.
    ///
    /// # Returns
    ///
    /// The error from `start` if it failed, otherwise the result of `stop`.
    pub async fn run<S, F>(&self, service: &mut S, shutdown: F) -> Result<(), WorkerError>
    where
        S: Service + ?Sized,
        F: Future<Output = ()>,
    {
        let run_result = {
            let running = service.start(self.token.clone());
            tokio::pin!(running);

            tokio::select! {
                result = &mut running => result,
                _ = shutdown => {
                    info!("Shutdown signal received, cancelling service");
                    self.token.cancel();
                    running.as_mut().await
                }
            }
        };
        self.token.cancel();

        if let Err(e) = &run_result {
            error!(error = %e, "Service exited with an error");
        }

        let stop_result = service.stop().await;
        if let Err(e) = &stop_result {
            error!(error = %e, "Failed to stop service");
        }

        run_result.and(stop_result)
    }
}

/// Resolve when the process receives Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
