//! Request body limits and parsing, the fifth ingress stage.
//!
//! # Responsibilities
//! - Reject bodies larger than the ceiling with 413 before any handler runs
//! - Decode JSON and URL-encoded bodies into the request context
//! - Reject malformed JSON, and bodies that fail mid-read, with 400
//! - Build the [`RequestContext`] handed to every later stage and handler
//!
//! # Design Decisions
//! - A declared `Content-Length` over the ceiling fails without reading
//! - Decoded bodies are re-attached as bytes so handler extractors still work
//! - Other content types stream through, capped by `RequestBodyLimitLayer`

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use http_body_util::LengthLimitError;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;

use crate::http::context::{ParsedBody, RequestContext};

pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request entity too large";
pub const MALFORMED_BODY_MESSAGE: &str = "Malformed request body";
pub const UNREADABLE_BODY_MESSAGE: &str = "Failed to read request body";

/// Settings for the body stage.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_bytes: usize,
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return BodyKind::Other;
        };

        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            BodyKind::Json
        } else if essence == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({ "message": PAYLOAD_TOO_LARGE_MESSAGE })),
    )
        .into_response()
}

fn malformed(detail: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": MALFORMED_BODY_MESSAGE, "error": detail })),
    )
        .into_response()
}

fn unreadable() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": UNREADABLE_BODY_MESSAGE })),
    )
        .into_response()
}

/// Whether the ceiling, rather than the transport, stopped the read.
fn is_length_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn decode(kind: BodyKind, bytes: &Bytes) -> Result<ParsedBody, String> {
    if bytes.is_empty() {
        return Ok(ParsedBody::None);
    }
    match kind {
        BodyKind::Json => serde_json::from_slice(bytes)
            .map(ParsedBody::Json)
            .map_err(|e| e.to_string()),
        BodyKind::Form => Ok(ParsedBody::Form(
            url::form_urlencoded::parse(bytes).into_owned().collect(),
        )),
        BodyKind::Other => Ok(ParsedBody::None),
    }
}

pub async fn body_parser_middleware(
    State(limits): State<BodyLimits>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut context = RequestContext::new(&request, limits.trust_proxy);

    if declared_length(request.headers()).is_some_and(|len| len > limits.max_bytes as u64) {
        tracing::warn!(client = %context.client_ip, url = %context.original_url, "Rejected oversized body");
        return too_large();
    }

    let kind = BodyKind::from_headers(request.headers());
    if kind == BodyKind::Other {
        let mut request = request;
        request.extensions_mut().insert(context);
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, limits.max_bytes).await {
        Ok(bytes) => bytes,
        Err(e) if is_length_limit(&e) => {
            tracing::warn!(client = %context.client_ip, url = %context.original_url, "Rejected oversized body");
            return too_large();
        }
        Err(e) => {
            tracing::warn!(client = %context.client_ip, url = %context.original_url, error = %e, "Failed to read body");
            return unreadable();
        }
    };

    context.body = match decode(kind, &bytes) {
        Ok(parsed) => parsed,
        Err(detail) => {
            tracing::debug!(url = %context.original_url, error = %detail, "Malformed body");
            return malformed(detail);
        }
    };

    parts.extensions.insert(context);
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Install the stage: parsing guard outermost, streaming cap for the rest,
/// and the extractor ceiling raised to match.
pub fn apply<S>(router: Router<S>, limits: BodyLimits) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(DefaultBodyLimit::max(limits.max_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_bytes))
        .layer(middleware::from_fn_with_state(limits, body_parser_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Extension, routing::post};
    use http_body_util::{BodyExt, Full, Limited};
    use tower::ServiceExt;

    fn app(max_bytes: usize) -> Router {
        let router = Router::new().route(
            "/echo",
            post(|Extension(ctx): Extension<RequestContext>| async move {
                Json(match ctx.body {
                    ParsedBody::None => json!(null),
                    ParsedBody::Json(v) => v,
                    ParsedBody::Form(pairs) => json!(pairs),
                })
            }),
        );
        apply(
            router,
            BodyLimits {
                max_bytes,
                trust_proxy: false,
            },
        )
    }

    fn post_body(content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    async fn json_body(res: Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_parses_json() {
        let res = app(1024)
            .oneshot(post_body("application/json", r#"{"product":"Laptop"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, json!({ "product": "Laptop" }));
    }

    #[tokio::test]
    async fn test_parses_form() {
        let res = app(1024)
            .oneshot(post_body(
                "application/x-www-form-urlencoded; charset=utf-8",
                "name=Warranty+A&years=2",
            ))
            .await
            .unwrap();

        assert_eq!(
            json_body(res).await,
            json!([["name", "Warranty A"], ["years", "2"]])
        );
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let res = app(1024)
            .oneshot(post_body("application/json", "{not json"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["message"], MALFORMED_BODY_MESSAGE);
    }

    #[tokio::test]
    async fn test_declared_length_over_ceiling() {
        let mut req = post_body("application/json", "{}");
        req.headers_mut()
            .insert(header::CONTENT_LENGTH, "4096".parse().unwrap());

        let res = app(1024).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(res).await["message"], PAYLOAD_TOO_LARGE_MESSAGE);
    }

    #[tokio::test]
    async fn test_streamed_body_over_ceiling() {
        let payload = format!(r#"{{"notes":"{}"}}"#, "x".repeat(2048));
        let res = app(1024)
            .oneshot(post_body("application/json", payload))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_eleven_megabytes_rejected_at_default_ceiling() {
        let payload = format!(r#"{{"notes":"{}"}}"#, "x".repeat(11 * 1024 * 1024));
        let res = app(crate::config::BODY_LIMIT_BYTES)
            .oneshot(post_body("application/json", payload))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_interrupted_body_is_bad_request() {
        // Fails after two bytes with an I/O error instead of the limit error.
        let body = Limited::new(Full::new(Bytes::from_static(br#"{"product":"Laptop"}"#)), 2)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away"));

        let res = app(1024)
            .oneshot(post_body("application/json", Body::new(body)))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["message"], UNREADABLE_BODY_MESSAGE);
    }

    #[tokio::test]
    async fn test_other_content_types_pass_through() {
        let res = app(1024)
            .oneshot(post_body("text/plain", "hello"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, json!(null));
    }
}
