//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → middleware/admission.rs (per-caller gate, 429 on rejection)
//!     → server.rs handler (acquire → one query → release)
//!     → response.rs (map store errors to status codes)
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
