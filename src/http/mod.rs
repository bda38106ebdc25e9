//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info, graceful shutdown)
//!     → pipeline.rs (six ingress stages, fixed order)
//!     → context.rs (client identity, parsed body, route group)
//!     → [routing layer dispatches to a route group]
//!     → static_files.rs (uploaded assets under two aliases)
//!     → docs.rs (OpenAPI document and Swagger UI page)
//!     → terminal.rs (JSON 404, centralized error envelope)
//!     → Send to client
//! ```

pub mod context;
pub mod docs;
pub mod pipeline;
pub mod response;
pub mod server;
pub mod static_files;
pub mod terminal;

pub use context::{ParsedBody, RequestContext};
pub use pipeline::{Pipeline, Stage};
pub use response::{ApiError, HandlerFailure};
pub use server::{build_app, AppState, HttpServer};
