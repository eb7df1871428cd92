//! Connection handle lifecycle.
//!
//! # Responsibilities
//! - Own exactly one open transport for one operation
//! - Carry diagnostics (id, acquisition time, attempts taken)
//! - Close the transport on `release()`, or in the background on drop
//!
//! # State Transitions
//! ```text
//! acquire() → Open → release() → Closed
//! ```
//! `release()` consumes the handle, so a closed handle cannot be queried
//! or released twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::within;
use crate::store::connector::{Row, Transport};
use crate::store::error::{QueryError, ReleaseError};

/// Relaxed ordering is enough; ids only need to be unique and increasing.
static HANDLE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an acquired handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(HANDLE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A live, exclusively owned session to the backing store.
pub struct ConnectionHandle {
    id: HandleId,
    transport: Option<Box<dyn Transport>>,
    acquired_at: SystemTime,
    opened: Instant,
    attempts: u32,
    release_timeout: Duration,
}

impl ConnectionHandle {
    pub(crate) fn open(transport: Box<dyn Transport>, attempts: u32, release_timeout: Duration) -> Self {
        metrics::handle_opened();
        Self {
            id: HandleId::next(),
            transport: Some(transport),
            acquired_at: SystemTime::now(),
            opened: Instant::now(),
            attempts,
            release_timeout,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Wall-clock time the handle was acquired.
    pub fn acquired_at(&self) -> SystemTime {
        self.acquired_at
    }

    pub fn age(&self) -> Duration {
        self.opened.elapsed()
    }

    /// Connect attempts it took to obtain this handle.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run one statement against the open transport.
    ///
    /// A failure here does not release the handle.
    pub async fn run_query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, QueryError> {
        let transport = self.transport.as_mut().ok_or(QueryError::Closed)?;
        transport.query(statement, params).await
    }

    /// Close the transport. Failures are logged, never returned.
    pub async fn release(mut self) {
        if let Some(transport) = self.transport.take() {
            close_transport(self.id, transport, self.release_timeout, self.opened).await;
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("open", &self.transport.is_some())
            .field("acquired_at", &self.acquired_at)
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        metrics::handle_closed();

        let Some(transport) = self.transport.take() else {
            return;
        };

        tracing::warn!(connection_id = %self.id, "Connection handle dropped without release");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(close_transport(self.id, transport, self.release_timeout, self.opened));
            }
            Err(_) => {
                tracing::warn!(connection_id = %self.id, "No runtime to close transport; dropping it");
                metrics::record_release("abandoned");
            }
        }
    }
}

async fn close_transport(id: HandleId, mut transport: Box<dyn Transport>, limit: Duration, opened: Instant) {
    let outcome = match within(limit, transport.close()).await {
        Ok(result) => result,
        Err(timed_out) => Err(ReleaseError::from(timed_out)),
    };

    let held_ms = opened.elapsed().as_millis() as u64;
    match outcome {
        Ok(()) => {
            tracing::debug!(connection_id = %id, held_ms, "Connection released");
            metrics::record_release("ok");
        }
        Err(e) => {
            tracing::warn!(connection_id = %id, held_ms, error = %e, "Connection release failed");
            metrics::record_release("error");
        }
    }
}
