//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay DB_* environment variables)
//!     → validation.rs (per-field findings, each logged as a warning)
//!     → AppConfig (immutable)
//!     → shared via Arc to the acquirer and the gate
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Missing credentials do not stop the process; they stop acquisition

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdmissionConfig;
pub use schema::AppConfig;
pub use schema::ConnectionConfig;
pub use schema::RetryConfig;
pub use schema::TlsConfig;
