//! Fault-isolating request middleware.
//!
//! Every route is wrapped by [`recover`]. A request leaves the middleware in
//! exactly one of two ways:
//!
//! ```text
//! handler returns normally   → response unchanged, one access record (INFO)
//! handler returns Err(Fault) → 500 + fault body, ERROR record unless controlled
//! handler panics             → 500 + payload dump, one ERROR record
//! ```
//!
//! Faulted requests never produce an access record.

use std::panic::AssertUnwindSafe;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;

use crate::http::fault::{Fault, FaultKind, FaultRecord};
use crate::http::inflight::InFlight;
use crate::http::request::RequestContext;
use crate::observability::{metrics, panics};

/// Middleware function: run the rest of the stack inside the recovery boundary.
pub async fn recover(State(in_flight): State<InFlight>, request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    let _guard = in_flight.track();

    let response = match AssertUnwindSafe(panics::contained(next.run(request)))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(panic) => Fault::from_panic(panic).into_response(),
    };

    match response.extensions().get::<FaultRecord>() {
        Some(record) => report_fault(&ctx, record),
        None => report_access(&ctx, &response),
    }

    response
}

fn report_access(ctx: &RequestContext, response: &Response) {
    let status = response.status().as_u16();
    tracing::info!(
        addr = %ctx.peer(),
        method = %ctx.method,
        host = %ctx.host,
        uri = %ctx.uri,
        elapsed = ?ctx.elapsed(),
        status,
        request_id = ctx.request_id.as_deref(),
        "Request served"
    );
    metrics::record_request(ctx.method.as_str(), status, ctx.arrived);
}

fn report_fault(ctx: &RequestContext, record: &FaultRecord) {
    metrics::record_fault(record.kind, ctx.arrived);

    if record.kind == FaultKind::Controlled {
        return;
    }

    tracing::error!(
        addr = %ctx.peer(),
        method = %ctx.method,
        host = %ctx.host,
        uri = %ctx.uri,
        request_id = ctx.request_id.as_deref(),
        kind = record.kind.as_label(),
        fault = %record.detail,
        "Request handler faulted"
    );
}
