//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay + http layers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Inbound x-request-id and the relay id are both logged for correlation
//! - Metric recording is a no-op until an exporter is installed

pub mod logging;
pub mod metrics;
