//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently inside the recovery boundary
//! - Report the drain size when the listener stops
//! - Publish the count as a gauge

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Process-wide request sequence.
static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

/// Tracks requests between entry and exit of the recovery middleware.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<AtomicU64>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request entering. Returns a guard that decrements on drop,
    /// including when the request future is dropped mid-flight.
    pub fn track(&self) -> InFlightGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_in_flight(now);
        InFlightGuard {
            active: Arc::clone(&self.active),
            seq: REQUEST_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Current number of in-flight requests.
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Guard held for a request's lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<AtomicU64>,
    seq: u64,
}

impl InFlightGuard {
    /// Process-wide sequence number of this request.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_in_flight(now);
        tracing::trace!(seq = self.seq, "Request left");
    }
}
