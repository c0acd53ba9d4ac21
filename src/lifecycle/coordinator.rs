//! Shutdown coordination.
//!
//! Waits for the exit notification, then stops the listener. Stop failures
//! are logged and swallowed: shutdown is best-effort and must not take the
//! process down.

use std::fmt::Display;
use std::future::Future;

use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::shutdown::ExitObserver;

/// Something that can be stopped gracefully.
pub trait GracefulStop: Send + Sync + 'static {
    type Error: Display + Send;

    fn stop(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl GracefulStop for HttpServer {
    type Error = ServerError;

    fn stop(&self) -> impl Future<Output = Result<(), ServerError>> + Send {
        HttpServer::stop(self)
    }
}

/// Body of the shutdown-coordinator task.
pub async fn coordinate_shutdown<T: GracefulStop>(exit: ExitObserver, target: &T) {
    exit.closed().await;
    tracing::info!("Exit notification received, stopping listener");

    match target.stop().await {
        Ok(()) => tracing::info!("Listener shut down"),
        Err(e) => tracing::error!(error = %e, "Listener shutdown failed"),
    }
}
