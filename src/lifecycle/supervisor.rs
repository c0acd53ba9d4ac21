//! The main loop.
//!
//! ```text
//! spawn listener task ──────────────┐
//! spawn shutdown-coordinator task   │ (fatal listener fault)
//! loop on signals:                  │
//!     SIGHUP        → log, continue │
//!     terminal/None → break ◀───────┘ (listener ended or faulted)
//! close exit notification  → coordinator stops the listener
//! wait for supervised tasks
//! flush and close the log sink
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::coordinator::coordinate_shutdown;
use crate::lifecycle::shutdown::ExitNotification;
use crate::lifecycle::signals::SignalSource;
use crate::lifecycle::tasks::SupervisedTaskSet;
use crate::lifecycle::ExitStatus;
use crate::observability::LogSink;

/// Owns the listener, the supervised tasks and the log sink for one process run.
pub struct Supervisor {
    server: Arc<HttpServer>,
    tasks: SupervisedTaskSet,
    sink: LogSink,
}

impl Supervisor {
    pub fn new(server: HttpServer, sink: LogSink) -> Self {
        Self {
            server: Arc::new(server),
            tasks: SupervisedTaskSet::new(),
            sink,
        }
    }

    /// Shared handle to the supervised listener.
    pub fn server(&self) -> Arc<HttpServer> {
        Arc::clone(&self.server)
    }

    pub fn tasks(&self) -> &SupervisedTaskSet {
        &self.tasks
    }

    /// Serve until a terminal signal (or a fatal listener fault), then shut
    /// down in order and report how the process should exit.
    pub async fn run<S: SignalSource>(self, mut signals: S) -> ExitStatus {
        let Supervisor { server, tasks, sink } = self;
        let exit = ExitNotification::new();
        let (done_tx, mut done_rx) = mpsc::channel::<Result<(), ServerError>>(1);

        let listener = Arc::clone(&server);
        tasks.spawn("listener", async move {
            let result = listener.run().await;
            if let Err(e) = &result {
                tracing::debug!(error = %e, "Listener run returned an error");
            }
            let _ = done_tx.try_send(result);
        });

        let observer = exit.observer();
        let target = Arc::clone(&server);
        tasks.spawn("shutdown-coordinator", async move {
            coordinate_shutdown(observer, target.as_ref()).await;
        });

        let status = loop {
            tokio::select! {
                received = signals.recv() => match received {
                    Some(signal) if !signal.is_terminal() => {
                        tracing::info!(signal = %signal, "Reload signal received, continuing");
                    }
                    Some(signal) => {
                        tracing::info!(signal = %signal, "Terminal signal received, shutting down");
                        break ExitStatus::Clean;
                    }
                    None => {
                        tracing::warn!("Signal source closed, shutting down");
                        break ExitStatus::Clean;
                    }
                },
                done = done_rx.recv() => match done {
                    Some(Ok(())) => {
                        tracing::info!("Listener stopped on its own, shutting down");
                        break ExitStatus::Clean;
                    }
                    Some(Err(err)) => {
                        let status = if err.is_startup() {
                            ExitStatus::StartupFailure
                        } else {
                            ExitStatus::ListenerFault
                        };
                        tracing::error!(
                            error = %err,
                            ?status,
                            "Listener fault is fatal, shutting down"
                        );
                        break status;
                    }
                    // Nothing reported: the listener task panicked, and the
                    // task set has already logged it.
                    None => {
                        tracing::warn!("Listener task ended unexpectedly, shutting down");
                        break ExitStatus::ListenerFault;
                    }
                },
            }
        };

        exit.close();
        tasks.wait().await;
        tracing::info!(?status, code = status.code(), "Supervised tasks finished");

        if let Err(e) = sink.close() {
            eprintln!("failed to flush log output: {e}");
        }
        status
    }
}
