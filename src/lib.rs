//! Process supervisor for an HTTP service.
//!
//! Runs the listener next to a signal-driven main loop, turns handler faults
//! into 500 responses, and on a termination signal stops accepting, drains
//! in-flight requests, waits for every supervised task and only then flushes
//! the log sink.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use http::{Fault, HttpServer};
pub use lifecycle::{ExitStatus, Supervisor};
pub use observability::LogSink;
