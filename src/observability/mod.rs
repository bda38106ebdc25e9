//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every subsystem:
//!     → logging.rs (tracing subscriber, JSON in production)
//!     → metrics.rs (counters and histograms, optional Prometheus export)
//!
//! Every request (ingress stage 6):
//!     → access_log.rs → console line (development)
//!                     → logs/access.log (production, combined format)
//! ```

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::{AccessLogEntry, AccessLogSink};
