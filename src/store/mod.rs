//! Backing store access.
//!
//! # Data Flow
//! ```text
//! request handler
//!     → acquirer.rs (resolve config, connect with retry)
//!     → connector.rs (one fresh transport per acquisition)
//!     → handle.rs (run one statement, then release)
//! ```
//!
//! # Design Decisions
//! - No shared pool: every acquisition opens its own transport and the
//!   handle that owns it is never shared between operations
//! - Only configuration errors and retry exhaustion cross the acquisition
//!   boundary; release failures are logged and swallowed

pub mod acquirer;
pub mod connector;
pub mod error;
pub mod handle;

pub use acquirer::ConnectionAcquirer;
pub use connector::{ConnectParams, Connector, PgConnector, Row, Transport};
pub use error::{AcquireError, ConfigurationError, ConnectError, QueryError, ReleaseError, StoreError};
pub use handle::{ConnectionHandle, HandleId};
