//! Configuration schema definitions.
//!
//! Every recognized option lives in one of these structs. Defaults are
//! declared next to the field they feed so the whole surface can be read
//! top to bottom.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use serde::Serialize;

/// Fixed ceiling for JSON and URL-encoded request bodies (10 MiB).
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/warrity";
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_UPLOAD_PATH: &str = "uploads";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

/// Name of the log directory under the working directory.
pub const LOG_DIR_NAME: &str = "logs";

/// Root configuration for the API server.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
    /// Directory holding `access.log` in production.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            database: DatabaseConfig::default(),
            observability: ObservabilityConfig::default(),
            log_dir: PathBuf::from(LOG_DIR_NAME),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Runtime mode. Anything other than `production` runs as development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Origins permitted to make credentialed cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowedOrigins {
    /// No origin restriction (`CORS_ORIGIN` unset, empty or `*`).
    Any,
    /// Exact origins, compared byte for byte.
    List(Vec<String>),
}

impl AllowedOrigins {
    pub fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim) else {
            return AllowedOrigins::Any;
        };
        if raw.is_empty() || raw == "*" {
            return AllowedOrigins::Any;
        }

        let origins: Vec<String> = raw
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }

    /// Returns true if a request carrying this `Origin` may proceed.
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(list) => list.iter().any(|o| o == origin),
        }
    }

    /// Value for the static gateway's fixed `Access-Control-Allow-Origin`.
    pub fn header_value(&self) -> HeaderValue {
        match self {
            AllowedOrigins::Any => HeaderValue::from_static("*"),
            AllowedOrigins::List(list) => list
                .first()
                .and_then(|o| HeaderValue::from_str(o).ok())
                .unwrap_or_else(|| HeaderValue::from_static("null")),
        }
    }
}

/// Fixed-window rate limit applied under `/api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitSettings {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
            max_requests: DEFAULT_RATE_LIMIT_MAX,
        }
    }
}

/// Settings read by the ingress pipeline and the static gateway.
///
/// Built once before the listener starts and only ever shared behind `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub allowed_origins: AllowedOrigins,
    pub rate_limit: RateLimitSettings,
    pub upload_dir: PathBuf,
    pub environment: Environment,
    pub body_limit: usize,
    /// Resolve client identity from `X-Forwarded-For` instead of the socket.
    pub trust_proxy: bool,
}

impl PipelineConfig {
    pub fn documents_dir(&self) -> PathBuf {
        self.upload_dir.join("documents")
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            rate_limit: RateLimitSettings::default(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_PATH),
            environment: Environment::Development,
            body_limit: BODY_LIMIT_BYTES,
            trust_proxy: false,
        }
    }
}

/// Document database connection settings.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub uri: String,
    pub server_selection_timeout_ms: u64,
    pub socket_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_MONGODB_URI.to_string(),
            server_selection_timeout_ms: 5_000,
            socket_timeout_ms: 45_000,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObservabilityConfig {
    /// Prometheus scrape listener; metrics export is off when unset.
    pub metrics_address: Option<String>,
}
