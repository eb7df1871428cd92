//! Resource acquisition and admission layer for request handlers.
//!
//! Every handler consults the [`AdmissionGate`] first, then asks the
//! [`ConnectionAcquirer`] for a [`ConnectionHandle`], runs one statement, and
//! releases the handle on every exit path.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod store;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::RetryPolicy;
pub use security::AdmissionGate;
pub use store::{AcquireError, ConnectionAcquirer, ConnectionHandle};
