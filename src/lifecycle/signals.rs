//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGQUIT, SIGTERM, SIGHUP)
//! - Translate signals to internal events
//! - Classify them: terminal (shut down) or reload (log and keep serving)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Anything not explicitly non-terminal is terminal (fail-safe)
//! - The main loop reads from a [`SignalSource`], so tests can inject signals

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;

/// A signal delivered to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Interrupt,
    Quit,
    Terminate,
    Hangup,
    /// Any other signal number.
    Other(i32),
}

/// What the main loop does with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Leave the wait loop and shut down.
    Terminal,
    /// Log and keep serving.
    Reload,
}

impl Signal {
    pub fn disposition(&self) -> Disposition {
        match self {
            Signal::Hangup => Disposition::Reload,
            Signal::Interrupt | Signal::Quit | Signal::Terminate | Signal::Other(_) => {
                Disposition::Terminal
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.disposition() == Disposition::Terminal
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Quit => f.write_str("SIGQUIT"),
            Signal::Terminate => f.write_str("SIGTERM"),
            Signal::Hangup => f.write_str("SIGHUP"),
            Signal::Other(number) => write!(f, "signal {number}"),
        }
    }
}

/// Stream of signals consumed by the main loop.
///
/// `None` means the source is exhausted; the main loop treats that as terminal.
pub trait SignalSource: Send {
    fn recv(&mut self) -> impl Future<Output = Option<Signal>> + Send;
}

impl SignalSource for mpsc::Receiver<Signal> {
    fn recv(&mut self) -> impl Future<Output = Option<Signal>> + Send {
        mpsc::Receiver::recv(self)
    }
}

impl SignalSource for mpsc::UnboundedReceiver<Signal> {
    fn recv(&mut self) -> impl Future<Output = Option<Signal>> + Send {
        mpsc::UnboundedReceiver::recv(self)
    }
}

/// Process signals as delivered by the operating system.
#[cfg(unix)]
pub struct OsSignals {
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    /// Register interest in SIGINT, SIGQUIT, SIGTERM and SIGHUP.
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let signals = Self {
            interrupt: signal(SignalKind::interrupt())?,
            quit: signal(SignalKind::quit())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        };
        tracing::debug!("Signal handlers registered");
        Ok(signals)
    }
}

#[cfg(unix)]
impl SignalSource for OsSignals {
    fn recv(&mut self) -> impl Future<Output = Option<Signal>> + Send {
        async move {
            tokio::select! {
                s = self.interrupt.recv() => s.map(|_| Signal::Interrupt),
                s = self.quit.recv() => s.map(|_| Signal::Quit),
                s = self.terminate.recv() => s.map(|_| Signal::Terminate),
                s = self.hangup.recv() => s.map(|_| Signal::Hangup),
            }
        }
    }
}

/// Process signals as delivered by the operating system (Ctrl-C only).
#[cfg(not(unix))]
pub struct OsSignals;

#[cfg(not(unix))]
impl OsSignals {
    pub fn register() -> std::io::Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    fn recv(&mut self) -> impl Future<Output = Option<Signal>> + Send {
        async move { tokio::signal::ctrl_c().await.ok().map(|_| Signal::Interrupt) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_hangup_is_non_terminal() {
        assert_eq!(Signal::Hangup.disposition(), Disposition::Reload);
        assert!(Signal::Interrupt.is_terminal());
        assert!(Signal::Quit.is_terminal());
        assert!(Signal::Terminate.is_terminal());
        assert!(Signal::Other(10).is_terminal());
    }

    #[test]
    fn display_uses_signal_names() {
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
        assert_eq!(Signal::Other(12).to_string(), "signal 12");
    }

    #[tokio::test]
    async fn channel_source_yields_in_order_then_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Signal::Hangup).await.unwrap();
        tx.send(Signal::Terminate).await.unwrap();
        drop(tx);

        assert_eq!(SignalSource::recv(&mut rx).await, Some(Signal::Hangup));
        assert_eq!(SignalSource::recv(&mut rx).await, Some(Signal::Terminate));
        assert_eq!(SignalSource::recv(&mut rx).await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn os_signals_register() {
        assert!(OsSignals::register().is_ok());
    }
}
