//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_key.rs (derive caller key from the source address)
//!     → admission.rs (fixed-window count per key)
//!     → admitted: handler acquires a connection
//!     → rejected: 429, no connection is attempted
//! ```
//!
//! # Design Decisions
//! - Admission is checked before any I/O and never blocks
//! - Fail closed: a request without a usable caller key is rejected
//! - The gate is an injected instance, not a process-wide singleton

pub mod admission;
pub mod client_key;

pub use admission::AdmissionGate;
pub use client_key::client_key;
