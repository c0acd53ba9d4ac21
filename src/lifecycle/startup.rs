//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialise the log sink, panic hook and metrics recorder
//! - Build the routes and the supervised listener
//! - Register signal handlers and hand control to the main loop
//!
//! # Design Decisions
//! - Fail fast: any startup error ends the process with `StartupFailure`
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last, inside the supervised listener task

use crate::config::ServiceConfig;
use crate::handlers;
use crate::http::HttpServer;
use crate::lifecycle::signals::OsSignals;
use crate::lifecycle::supervisor::Supervisor;
use crate::lifecycle::ExitStatus;
use crate::observability::{install_panic_hook, metrics, LogSink};

/// Run the whole service for one process lifetime.
pub async fn launch(config: ServiceConfig) -> ExitStatus {
    let sink = match LogSink::stdout(&config.observability) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("failed to initialise logging: {e}");
            return ExitStatus::StartupFailure;
        }
    };
    if let Err(e) = sink.install() {
        eprintln!("failed to initialise logging: {e}");
        return ExitStatus::StartupFailure;
    }
    install_panic_hook();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-supervisor starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.listener.max_body_bytes,
        static_files = config.static_files.enabled,
        profiling = config.observability.profiling_enabled,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        metrics::init_metrics()
    } else {
        None
    };

    let signals = match OsSignals::register() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register signal handlers");
            if let Err(e) = sink.close() {
                eprintln!("failed to flush log output: {e}");
            }
            return ExitStatus::StartupFailure;
        }
    };

    let routes = handlers::routes(&config, metrics_handle);
    let server = HttpServer::new(config.listener, routes);

    Supervisor::new(server, sink).run(signals).await
}
