//! Configuration loading from the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::schema::{
    AllowedOrigins, AppConfig, DatabaseConfig, Environment, ObservabilityConfig, PipelineConfig,
    RateLimitSettings, ServerConfig, BODY_LIMIT_BYTES, DEFAULT_HOST, DEFAULT_MONGODB_URI,
    DEFAULT_PORT, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW_MS, DEFAULT_UPLOAD_PATH,
    LOG_DIR_NAME,
};
use crate::config::validation::{flag, non_empty, positive_or};

pub const MONGODB_URI: &str = "MONGODB_URI";
pub const CORS_ORIGIN: &str = "CORS_ORIGIN";
pub const RATE_LIMIT_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
pub const RATE_LIMIT_MAX: &str = "RATE_LIMIT_MAX";
pub const UPLOAD_PATH: &str = "UPLOAD_PATH";
pub const NODE_ENV: &str = "NODE_ENV";
pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";
pub const TRUST_PROXY: &str = "TRUST_PROXY";
pub const METRICS_ADDRESS: &str = "METRICS_ADDRESS";

impl AppConfig {
    /// Build the configuration from a key/value map.
    ///
    /// Relative paths are resolved against `base_dir`. This function has no
    /// side effects; directory creation happens in
    /// [`crate::lifecycle::startup::ensure_directories`].
    pub fn from_map(vars: &HashMap<String, String>, base_dir: &Path) -> Self {
        let upload_path = non_empty(vars, UPLOAD_PATH).unwrap_or(DEFAULT_UPLOAD_PATH);

        let pipeline = PipelineConfig {
            allowed_origins: AllowedOrigins::parse(vars.get(CORS_ORIGIN).map(String::as_str)),
            rate_limit: RateLimitSettings {
                window_ms: positive_or(vars, RATE_LIMIT_WINDOW_MS, DEFAULT_RATE_LIMIT_WINDOW_MS),
                max_requests: positive_or(vars, RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_MAX),
            },
            upload_dir: base_dir.join(upload_path),
            environment: Environment::parse(non_empty(vars, NODE_ENV)),
            body_limit: BODY_LIMIT_BYTES,
            trust_proxy: flag(vars, TRUST_PROXY),
        };

        let server = ServerConfig {
            host: non_empty(vars, HOST).unwrap_or(DEFAULT_HOST).to_string(),
            port: positive_or(vars, PORT, DEFAULT_PORT),
        };

        let database = DatabaseConfig {
            uri: non_empty(vars, MONGODB_URI)
                .unwrap_or(DEFAULT_MONGODB_URI)
                .to_string(),
            ..DatabaseConfig::default()
        };

        let observability = ObservabilityConfig {
            metrics_address: non_empty(vars, METRICS_ADDRESS).map(str::to_string),
        };

        Self {
            server,
            pipeline,
            database,
            observability,
            log_dir: base_dir.join(LOG_DIR_NAME),
        }
    }

    /// Build the configuration from the process environment, relative to the
    /// current working directory.
    pub fn from_env() -> std::io::Result<Self> {
        let base_dir = std::env::current_dir()?;
        let vars: HashMap<String, String> = std::env::vars().collect();
        Ok(Self::from_map(&vars, &base_dir))
    }
}

/// Load `.env` files into the process environment.
///
/// An explicit file wins; otherwise `.env` in the working directory and then
/// `../.env.local` are read. Variables already present are never overwritten.
/// Returns the files that were loaded.
pub fn load_dotenv(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut loaded = Vec::new();

    if let Some(path) = explicit {
        match dotenvy::from_path(path) {
            Ok(()) => loaded.push(path.to_path_buf()),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to load env file"),
        }
        return loaded;
    }

    if let Ok(path) = dotenvy::dotenv() {
        loaded.push(path);
    }

    let local = Path::new("..").join(".env.local");
    if local.exists() && dotenvy::from_path(&local).is_ok() {
        loaded.push(local);
    }

    loaded
}
