//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! acquire():
//!     → timeouts.rs (bound each connect attempt)
//!     → On failure: retries.rs (advance attempt counter, sleep fixed delay)
//!     → Budget spent: ConnectionExhausted surfaces to the caller
//!
//! release():
//!     → timeouts.rs (bound transport close)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are bounded by an explicit counter, never by recursion
//! - Configuration errors are never retried

pub mod retries;
pub mod timeouts;

pub use retries::{NextStep, RetryPolicy, RetryState};
pub use timeouts::{within, TimedOut};
