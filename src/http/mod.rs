//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (listener lifecycle, middleware stack)
//!     → request.rs (request ID, request context)
//!     → recovery.rs (fault boundary, access/fault records)
//!     → handler (returns Result<_, Fault>)
//!     → fault.rs (fault → 500 response)
//!     → Send to client
//! ```

pub mod fault;
pub mod inflight;
pub mod recovery;
pub mod request;
pub mod server;

pub use fault::{Fault, FaultKind, FaultRecord};
pub use request::{RequestContext, UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError, ServerState};
