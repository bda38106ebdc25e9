//! Cross-origin resource sharing, the third ingress stage.
//!
//! # Responsibilities
//! - Reject requests whose `Origin` is not allowed before any handler runs
//! - Answer preflights and decorate responses for allowed origins
//!
//! # Design Decisions
//! - Requests without `Origin` (same-origin, server-to-server) pass untouched
//! - "Allow all" mirrors the caller's origin so credentials stay usable
//! - Methods and request headers are fixed, not configurable

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AllowedOrigins;
use crate::observability::metrics;

pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

pub const ALLOWED_HEADERS: [header::HeaderName; 2] = [header::CONTENT_TYPE, header::AUTHORIZATION];

pub const REJECTION_MESSAGE: &str = "Not allowed by CORS";

/// The header-producing half of the stage.
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::mirror_request(),
        AllowedOrigins::List(list) => AllowOrigin::list(
            list.iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .allow_credentials(true)
}

/// The rejecting half of the stage.
pub async fn origin_guard(
    State(origins): State<Arc<AllowedOrigins>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or_default());

    if let Some(origin) = origin {
        if !origins.allows(origin) {
            tracing::warn!(
                origin,
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected cross-origin request"
            );
            metrics::record_cors_rejected();
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": REJECTION_MESSAGE })),
            )
                .into_response();
        }
    }

    next.run(request).await
}

/// Install both halves; the guard runs first.
pub fn apply<S>(router: Router<S>, origins: &AllowedOrigins) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(cors_layer(origins))
        .layer(middleware::from_fn_with_state(
            Arc::new(origins.clone()),
            origin_guard,
        ))
}
