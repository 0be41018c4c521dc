//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate, dispatcher and server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Connection id and route label are recorded on every dispatch span
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
