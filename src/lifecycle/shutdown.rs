//! Exit notification for the supervised tasks.

use tokio::sync::watch;

/// One-shot broadcast telling supervised tasks the process is exiting.
///
/// Owned by the main loop. [`close`](Self::close) consumes the value, so the
/// notification cannot be closed twice; everything else holds an
/// [`ExitObserver`].
#[derive(Debug)]
pub struct ExitNotification {
    tx: watch::Sender<bool>,
}

impl ExitNotification {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Hand out a read-only view of the notification.
    pub fn observer(&self) -> ExitObserver {
        ExitObserver {
            rx: self.tx.subscribe(),
        }
    }

    /// Close the notification, waking every observer.
    pub fn close(self) {
        self.tx.send_replace(true);
        tracing::debug!(observers = self.tx.receiver_count(), "Exit notification closed");
    }
}

impl Default for ExitNotification {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of an [`ExitNotification`]. Cheap to clone.
///
/// Dropping the owner without closing counts as closed, so observers are
/// never stranded.
#[derive(Debug, Clone)]
pub struct ExitObserver {
    rx: watch::Receiver<bool>,
}

impl ExitObserver {
    /// Resolve once the notification is closed.
    pub async fn closed(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    pub fn is_closed(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }
}
