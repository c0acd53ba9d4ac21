//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events through the LogSink)
//!     → metrics.rs (counters, gauges, histograms)
//!     → panics.rs (silent panic hook, panic locations for fault records)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → /debug/pprof/metrics (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
pub mod panics;

pub use logging::{LogError, LogSink};
pub use panics::install_panic_hook;
