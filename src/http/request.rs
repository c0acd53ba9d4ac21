//! Per-request metadata.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Capture what the access and fault records report (peer, method, host, target)
//!
//! # Design Decisions
//! - Request ID added as early as possible, outside the recovery boundary
//! - Context is built before the handler runs, so it survives a panic

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id: HeaderValue = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Metadata of one request, from entry to exit of the recovery middleware.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Peer address, when the transport provided one.
    pub remote_addr: Option<SocketAddr>,
    pub method: Method,
    pub host: String,
    /// Request target as received (path and query).
    pub uri: String,
    pub request_id: Option<String>,
    pub arrived: Instant,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let uri = request
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| request.uri().to_string());

        let request_id = request
            .extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .map(str::to_owned);

        Self {
            remote_addr,
            method: request.method().clone(),
            host,
            uri,
            request_id,
            arrived: Instant::now(),
        }
    }

    /// Peer address for logging, `-` when unknown.
    pub fn peer(&self) -> String {
        self.remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Wall-clock time since the request entered.
    pub fn elapsed(&self) -> Duration {
        self.arrived.elapsed()
    }
}
