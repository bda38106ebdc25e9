//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env / ../.env.local (dotenvy)
//!     → process environment
//!     → loader.rs (key/value map → AppConfig, pure)
//!     → validation.rs (fallback to defaults, warn on bad values)
//!     → AppConfig (immutable)
//!     → shared via Arc to the pipeline, gateway and connector
//! ```
//!
//! # Design Decisions
//! - Config is frozen before the listener binds; nothing mutates it afterwards
//! - Every option and its default is enumerated in schema.rs
//! - Invalid input never fails startup, it falls back to the default

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_dotenv;
pub use schema::{
    AllowedOrigins, AppConfig, DatabaseConfig, Environment, ObservabilityConfig, PipelineConfig,
    RateLimitSettings, ServerConfig, BODY_LIMIT_BYTES,
};
