//! Error responses.
//!
//! # Responsibilities
//! - Define the error type route groups return
//! - Mark failed responses so the centralized error layer can rewrite them
//! - Define the JSON envelopes for errors and unmatched routes
//!
//! # Design Decisions
//! - Handlers never pick the user-visible error text; the error layer does,
//!   based on the runtime mode
//! - A failure carries its status; anything without one is a 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

/// Marker left on a response by a failing handler.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub status: StatusCode,
    pub message: String,
}

/// Errors returned by route-group handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    WithStatus { status: StatusCode, message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::WithStatus {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::WithStatus { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let failure = HandlerFailure {
            status: self.status(),
            message: self.to_string(),
        };
        let mut response = (
            failure.status,
            Json(json!({ "message": canonical_message(failure.status) })),
        )
            .into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

/// Envelope for every error that reaches the centralized error layer.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub message: String,
    /// The original message in development, `{}` in production.
    #[schema(value_type = Object)]
    pub error: Value,
}

/// Envelope for requests no route or asset matched.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotFoundBody {
    pub message: String,
    pub path: String,
}

pub fn canonical_message(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Internal Server Error")
}
