//! Terminal handlers: the two catch-alls that close the chain.
//!
//! # Responsibilities
//! - Answer requests that matched no route group or asset with a JSON 404
//! - Turn every handler failure and panic into the JSON error envelope
//! - Log each failure once, with status, message, path, method and client
//!
//! # Design Decisions
//! - Verbosity is decided here and nowhere else: the underlying message is
//!   exposed in development only
//! - Rejections produced by the ingress stages never reach this layer

use std::any::Any;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::Environment;
use crate::http::context::{client_ip, RequestContext};
use crate::http::response::{canonical_message, ErrorEnvelope, HandlerFailure, NotFoundBody};

pub const NOT_FOUND_MESSAGE: &str = "Route not found";

/// Fallback for every unmatched request.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<NotFoundBody>) {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            message: NOT_FOUND_MESSAGE.to_string(),
            path,
        }),
    )
}

/// Centralized error layer.
pub async fn handle_errors(
    State(environment): State<Environment>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (url, client) = match request.extensions().get::<RequestContext>() {
        Some(ctx) => (ctx.original_url.clone(), ctx.client_ip),
        None => (request.uri().to_string(), client_ip(&request, false)),
    };
    let method = request.method().clone();

    let response = next.run(request).await;
    let Some(failure) = response.extensions().get::<HandlerFailure>() else {
        return response;
    };

    tracing::error!(
        "{} - {} - {} - {} - {}",
        failure.status.as_u16(),
        failure.message,
        url,
        method,
        client
    );
    envelope(environment, failure)
}

/// Render `failure` as the error envelope for `environment`.
pub fn envelope(environment: Environment, failure: &HandlerFailure) -> Response {
    let error = if environment.is_production() {
        json!({})
    } else {
        Value::String(failure.message.clone())
    };

    (
        failure.status,
        Json(ErrorEnvelope {
            message: canonical_message(failure.status).to_string(),
            error,
        }),
    )
        .into_response()
}

/// Failure recorded for a caught panic, carrying the panic message.
pub fn panic_failure(panic: Box<dyn Any + Send + 'static>) -> HandlerFailure {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Handler panicked".to_string()
    };

    HandlerFailure {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message,
    }
}

/// Response for a panicking handler, rewritten by [`handle_errors`].
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(panic_failure(panic));
    response
}

/// Envelope for a panic raised outside the error layer, in an ingress stage.
pub fn panic_envelope(environment: Environment, panic: Box<dyn Any + Send + 'static>) -> Response {
    let failure = panic_failure(panic);
    tracing::error!("{} - {} - ingress", failure.status.as_u16(), failure.message);
    envelope(environment, &failure)
}
