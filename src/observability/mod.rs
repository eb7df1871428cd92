//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! acquirer, handle, gate:
//!     → logging.rs (structured events: attempt, elapsed, cause)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every connect attempt and every release failure leaves a record
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;
