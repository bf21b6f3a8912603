//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle / reactor / interceptor callback
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stderr (fmt layer, EnvFilter)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - State transitions log at info, per-request decisions at debug/trace
//! - Metric updates are cheap enough for the blocking request path

pub mod logging;
pub mod metrics;
