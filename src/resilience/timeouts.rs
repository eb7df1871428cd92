//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every connect attempt by the configured connect timeout
//! - Bound transport close so release never blocks indefinitely
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry,
//!   which tears down any half-open socket it owned
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// An operation did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {}ms", .0.as_millis())]
pub struct TimedOut(pub Duration);

/// Run `fut` to completion or fail once `limit` elapses.
pub async fn within<F>(limit: Duration, fut: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| TimedOut(limit))
}
