//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request that cleared the ingress pipeline
//!     → router.rs (resolve route group, longest prefix first)
//!     → matcher.rs (segment-aware prefix match)
//!     → mounted group router, or the not-found handler
//! ```
//!
//! # Design Decisions
//! - Groups are fixed at startup, immutable at runtime
//! - Prefix matching only, no regex in the hot path
//! - The router never inspects bodies or enforces business rules

pub mod groups;
pub mod matcher;
pub mod router;

pub use router::{RouteGroup, RouteTable, Routes};
