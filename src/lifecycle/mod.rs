//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build log sink → Build routes → Register signals → Supervisor::run
//!
//! Main loop (supervisor.rs):
//!     Spawn listener + coordinator → wait for terminal signal
//!     → close exit notification → wait for tasks → close log sink
//!
//! Shutdown (coordinator.rs, shutdown.rs):
//!     Exit notification closed → stop accepting → drain in-flight → Stopped
//!
//! Signals (signals.rs):
//!     SIGINT/SIGQUIT/SIGTERM (and anything unknown) → graceful shutdown
//!     SIGHUP → logged, keep serving
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, wait for tasks, flush logs
//! - No shutdown deadline: in-flight requests are never cut off
//! - Exit codes distinguish clean shutdown from startup and listener failures

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;
pub mod tasks;

pub use shutdown::{ExitNotification, ExitObserver};
pub use signals::{OsSignals, Signal, SignalSource};
pub use supervisor::Supervisor;
pub use tasks::SupervisedTaskSet;

use std::process::ExitCode;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Terminal signal, orderly shutdown.
    Clean,
    /// Config, logging, signal registration or bind failed.
    StartupFailure,
    /// The listener failed while serving.
    ListenerFault,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::StartupFailure => 1,
            ExitStatus::ListenerFault => 2,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
