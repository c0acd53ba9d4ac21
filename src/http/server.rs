//! HTTP listener lifecycle.
//!
//! # Responsibilities
//! - Wrap the application routes with the recovery boundary and request IDs
//! - Bind the configured address and serve connections
//! - Stop accepting on request, drain in-flight requests, report `Stopped`
//!
//! # States
//! ```text
//! Created ──run()──▶ Running ──stop()──▶ Stopping ──drained──▶ Stopped
//!    │                                                            ▲
//!    └──────────────────────── bind failure ──────────────────────┘
//! ```
//!
//! # Design Decisions
//! - `stop()` is idempotent; every caller returns after the single `Stopped`
//!   transition
//! - A `stop()` issued before `run()` is kept pending and honoured right after
//!   the bind, so shutdown never races startup
//! - No forced cancellation: drain time is bounded only by the handlers
//! - `listener.max_body_bytes` is the only body limit; axum's own default is
//!   disabled so extractors report the listener's limit as 413

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::ListenerConfig;
use crate::http::inflight::InFlight;
use crate::http::recovery::recover;
use crate::http::request::UuidRequestId;

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address `{address}`: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("listener failed while serving: {0}")]
    Serve(#[source] std::io::Error),

    #[error("listener already started")]
    AlreadyStarted,

    #[error("listener never reached the running state")]
    NotRunning,

    #[error("listener failed while draining: {0}")]
    Drain(String),
}

impl ServerError {
    /// True for failures that happen before the listener accepts anything.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidAddress { .. } | ServerError::Bind { .. }
        )
    }
}

/// The supervised HTTP listener.
///
/// Shared behind an `Arc`: one task calls [`run`](Self::run), any number of
/// tasks may call [`stop`](Self::stop).
pub struct HttpServer {
    config: ListenerConfig,
    app: Router,
    in_flight: InFlight,
    started: AtomicBool,
    stop_requested: watch::Sender<bool>,
    state: watch::Sender<ServerState>,
    local_addr: OnceLock<SocketAddr>,
    drain_failure: OnceLock<String>,
}

impl HttpServer {
    /// Create a listener serving `routes`. Every route is wrapped by the
    /// recovery middleware.
    pub fn new(config: ListenerConfig, routes: Router) -> Self {
        let in_flight = InFlight::new();
        let app = Self::build_router(&config, routes, in_flight.clone());
        let (state, _) = watch::channel(ServerState::Created);
        let (stop_requested, _) = watch::channel(false);

        Self {
            config,
            app,
            in_flight,
            started: AtomicBool::new(false),
            stop_requested,
            state,
            local_addr: OnceLock::new(),
            drain_failure: OnceLock::new(),
        }
    }

    /// Wrap the routes with all middleware layers, outermost first.
    fn build_router(config: &ListenerConfig, routes: Router, in_flight: InFlight) -> Router {
        routes.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::from_fn_with_state(in_flight, recover))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(config.max_body_bytes)),
        )
    }

    /// Bind and serve until stopped.
    ///
    /// Returns `Ok(())` after a clean stop, or the bind/transport failure.
    pub async fn run(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }

        // Reached however `run` ends, including a panic or a dropped future.
        let _stopped = StoppedOnExit(&self.state);

        let (listener, addr) = self.bind().await?;
        let _ = self.local_addr.set(addr);

        self.state.send_modify(|state| {
            *state = if *self.stop_requested.borrow() {
                ServerState::Stopping
            } else {
                ServerState::Running
            };
        });
        tracing::info!(address = %addr, "Listener running");

        let app = self
            .app
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>();
        let mut stop_rx = self.stop_requested.subscribe();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            })
            .await;

        if let Err(e) = &result {
            if *self.stop_requested.borrow() {
                let _ = self.drain_failure.set(e.to_string());
            }
        }

        tracing::info!(address = %addr, "Listener stopped");

        result.map_err(ServerError::Serve)
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr), ServerError> {
        let addr: SocketAddr =
            self.config
                .bind_address
                .parse()
                .map_err(|source| ServerError::InvalidAddress {
                    address: self.config.bind_address.clone(),
                    source,
                })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { address: addr, source })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address: addr, source })?;

        Ok((listener, local_addr))
    }

    /// Stop accepting, let in-flight requests finish, wait for `Stopped`.
    ///
    /// Safe to call concurrently and repeatedly. Called before `run`, the
    /// request stays pending until `run` has bound the listener.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let already_requested = self.stop_requested.send_replace(true);

        let transitioned = self.state.send_if_modified(|state| {
            if *state == ServerState::Running {
                *state = ServerState::Stopping;
                true
            } else {
                false
            }
        });

        if transitioned {
            tracing::info!(
                in_flight = self.in_flight.count(),
                "Listener stopping, draining in-flight requests"
            );
        } else if !already_requested && self.state() == ServerState::Created {
            tracing::debug!("Stop requested before the listener started");
        }

        let mut state = self.state.subscribe();
        state
            .wait_for(|state| *state == ServerState::Stopped)
            .await
            .map_err(|_| ServerError::NotRunning)?;

        match self.drain_failure.get() {
            Some(message) => Err(ServerError::Drain(message.clone())),
            None => Ok(()),
        }
    }

    /// Wait until `run` has bound the listener and return its address.
    pub async fn wait_until_running(&self) -> Result<SocketAddr, ServerError> {
        let mut state = self.state.subscribe();
        state
            .wait_for(|state| *state != ServerState::Created)
            .await
            .map_err(|_| ServerError::NotRunning)?;

        self.local_addr().ok_or(ServerError::NotRunning)
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Address the listener is bound to, once running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// The routes wrapped with the full middleware stack.
    pub fn app(&self) -> &Router {
        &self.app
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}

/// Publishes `Stopped` when dropped.
struct StoppedOnExit<'a>(&'a watch::Sender<ServerState>);

impl Drop for StoppedOnExit<'_> {
    fn drop(&mut self) {
        self.0.send_replace(ServerState::Stopped);
    }
}
