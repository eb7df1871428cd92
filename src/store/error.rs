//! Error taxonomy for acquisition, queries, and release.

use thiserror::Error;

use crate::resilience::TimedOut;

/// A required connection parameter is missing or unusable at the time of use.
///
/// Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("connection parameter `{0}` is not configured")]
    Missing(&'static str),

    #[error("connection parameter `{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A single connect attempt failed. Retried until the budget is spent.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connect attempt {0}")]
    Timeout(#[from] TimedOut),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors that cross the acquisition boundary.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The store stayed unreachable for the whole attempt budget.
    #[error("maximum retry attempts reached ({attempts}): {last_error}")]
    Exhausted { attempts: u32, last_error: ConnectError },
}

impl AcquireError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, AcquireError::Exhausted { .. })
    }
}

/// The operation run against an open handle failed.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query failed: {0}")]
    Database(String),

    #[error("unsupported parameter at position {position}: {reason}")]
    Parameter { position: usize, reason: String },

    #[error("column `{column}` has type {type_name}, which has no JSON mapping")]
    UnsupportedColumn { column: String, type_name: String },

    #[error("connection is closed")]
    Closed,
}

/// Closing a transport failed. Logged, never propagated.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("close {0}")]
    Timeout(#[from] TimedOut),

    #[error("close failed: {0}")]
    Transport(String),
}

/// Failure of a scoped single operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Query(#[from] QueryError),
}
