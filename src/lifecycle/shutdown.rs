//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;

/// Why the process is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal, by name.
    Signal(&'static str),
    /// Stopped programmatically (tests, embedding).
    Requested,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "signal {}", name),
            ShutdownReason::Requested => write!(f, "requested"),
        }
    }
}

/// Coordinator for graceful shutdown.
///
/// Late subscribers still observe a shutdown that was triggered before they
/// started waiting.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Trigger shutdown. Only the first reason is kept and logged.
    pub fn trigger(&self, reason: ShutdownReason) {
        let first = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
        if first {
            tracing::info!(reason = %reason, "Shutdown triggered");
        }
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(reason) => *reason,
            Err(_) => None,
        };
        reason.unwrap_or(ShutdownReason::Requested)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
