//! Warrity API: the request-ingress side of the warranty tracking service.
//!
//! Configuration, the database connector, the six-stage ingress pipeline,
//! the static asset gateway, route-group dispatch and the terminal handlers.
//! Route groups themselves are mounted by their owners through
//! [`routing::Routes`].

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{RouteGroup, Routes};
