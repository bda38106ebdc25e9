//! Built-in route groups.
//!
//! Health and service-info report on the pipeline itself, so they ship with
//! the server. Every other group is mounted by its owner through
//! [`Routes::mount`].

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::http::server::AppState;
use crate::persistence::ConnectionState;
use crate::routing::router::{RouteGroup, Routes, API_VERSION};

pub const SERVICE_NAME: &str = "Warrity API";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// `ok` when the database is connected, `degraded` otherwise.
    pub status: String,
    pub database: String,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
}

/// Liveness and database state.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "service",
    responses(
        (status = 200, description = "Database connected", body = HealthStatus),
        (status = 503, description = "Database not connected", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let database = state.database_state();
    let (code, status) = match database {
        ConnectionState::Connected => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    (
        code,
        Json(HealthStatus {
            status: status.to_string(),
            database: database.as_str().to_string(),
            uptime_secs: state.started_at.elapsed().as_secs(),
            timestamp: Utc::now(),
        }),
    )
}

/// Static description of the running service.
#[utoipa::path(
    get,
    path = "/api/service-info",
    tag = "service",
    responses((status = 200, description = "Service description", body = ServiceInfo))
)]
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    let pipeline = &state.config.pipeline;
    Json(ServiceInfo {
        name: SERVICE_NAME.to_string(),
        version: API_VERSION.to_string(),
        environment: pipeline.environment.as_str().to_string(),
        rate_limit_window_ms: pipeline.rate_limit.window_ms,
        rate_limit_max: pipeline.rate_limit.max_requests,
    })
}

impl Routes {
    /// Routes with the built-in groups mounted.
    pub fn with_builtin() -> Self {
        Routes::new()
            .mount(RouteGroup::Health, Router::new().route("/", get(health)))
            .mount(
                RouteGroup::ServiceInfo,
                Router::new().route("/", get(service_info)),
            )
    }
}
