//! Security subsystem: the rejecting stages of the ingress pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (hardening headers on the way out)
//!     → cors.rs (reject foreign origins, answer preflights)
//!     → rate_limit.rs (per-client window under /api)
//!     → limits.rs (size ceiling, JSON / form decoding)
//!     → Pass to access logging and routing
//! ```
//!
//! # Design Decisions
//! - Each stage answers its own rejections with a JSON `message`
//! - Nothing here propagates to the centralized error handler

pub mod cors;
pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use limits::BodyLimits;
pub use rate_limit::{RateLimitState, RateLimitStatus, RateLimiter};
