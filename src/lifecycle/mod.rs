//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Log findings → Build gate and acquirer → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → log → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests finish → exit
//! ```
//!
//! # Design Decisions
//! - No long-lived store connection exists, so there is nothing to close
//!   beyond what in-flight requests release themselves
//! - The shutdown event is always logged

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownReason};
