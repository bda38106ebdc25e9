//! Static asset gateway for uploaded files.
//!
//! # Responsibilities
//! - Serve the upload root, and its `documents` subdirectory, from disk
//! - Decorate asset responses with their own cross-origin header set
//!
//! # Design Decisions
//! - The same gateway is nested under `/uploads` and `/api/uploads`, so both
//!   aliases resolve to one directory with identical headers
//! - Missing files are answered by the file server, not the JSON 404
//! - Other file server failures are marked as handler failures, so the error
//!   layer answers them with the JSON envelope
//! - Only `GET` and `OPTIONS` are advertised to cross-origin callers

use std::path::Path;

use axum::{
    http::{header, HeaderName, HeaderValue},
    middleware,
    response::Response,
    Router,
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

use crate::config::AllowedOrigins;
use crate::http::response::HandlerFailure;

/// Mount points of the gateway.
pub const ASSET_PREFIXES: [&str; 2] = ["/uploads", "/api/uploads"];

pub const DOCUMENTS_DIR: &str = "documents";

pub const ASSET_FAILURE_MESSAGE: &str = "Failed to read asset";

/// Headers set on every asset response, replacing anything already present.
pub fn asset_headers(origins: &AllowedOrigins) -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, origins.header_value()),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-embedder-policy"),
            HeaderValue::from_static("require-corp"),
        ),
    ]
}

/// File-serving router for one alias: `documents/` first, then the root.
pub fn gateway<S>(upload_dir: &Path, origins: &AllowedOrigins) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let files = Router::new()
        .nest_service(
            &format!("/{DOCUMENTS_DIR}"),
            ServeDir::new(upload_dir.join(DOCUMENTS_DIR)),
        )
        .fallback_service(ServeDir::new(upload_dir))
        .layer(middleware::map_response(mark_server_errors));

    asset_headers(origins)
        .into_iter()
        .fold(files, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(name, value))
        })
}

/// Tag a bare 5xx from the file server so the error layer renders it.
async fn mark_server_errors(mut response: Response) -> Response {
    let status = response.status();
    if status.is_server_error() && response.extensions().get::<HandlerFailure>().is_none() {
        response.extensions_mut().insert(HandlerFailure {
            status,
            message: ASSET_FAILURE_MESSAGE.to_string(),
        });
    }
    response
}

/// Nest the gateway under every alias of `router`.
pub fn mount<S>(router: Router<S>, upload_dir: &Path, origins: &AllowedOrigins) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let gateway = gateway(upload_dir, origins);
    ASSET_PREFIXES
        .into_iter()
        .fold(router, |router, prefix| router.nest(prefix, gateway.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::IntoResponse,
    };
    use tower::ServiceExt;

    fn app(dir: &Path, origins: AllowedOrigins) -> Router {
        mount(Router::new(), dir, &origins)
    }

    fn seed() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(DOCUMENTS_DIR)).unwrap();
        std::fs::write(dir.path().join("documents/receipt.txt"), b"paid in full").unwrap();
        std::fs::write(dir.path().join("avatar.txt"), b"avatar").unwrap();
        dir
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_documents_under_both_aliases() {
        let dir = seed();
        for prefix in ASSET_PREFIXES {
            let (status, headers, body) =
                get(app(dir.path(), AllowedOrigins::Any), &format!("{prefix}/documents/receipt.txt")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, b"paid in full");
            assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
            assert_eq!(headers["cross-origin-embedder-policy"], "require-corp");
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
        }
    }

    #[tokio::test]
    async fn test_upload_root_served() {
        let dir = seed();
        let (status, _, body) = get(app(dir.path(), AllowedOrigins::Any), "/api/uploads/avatar.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"avatar");
    }

    #[tokio::test]
    async fn test_configured_origin_echoed() {
        let dir = seed();
        let origins = AllowedOrigins::List(vec!["https://app.warrity.com".into()]);
        let (_, headers, _) = get(app(dir.path(), origins), "/uploads/avatar.txt").await;
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.warrity.com");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_missing_file_is_file_server_404() {
        let dir = seed();
        let (status, _, body) = get(app(dir.path(), AllowedOrigins::Any), "/uploads/documents/nope.pdf").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_over_long_name_marked_as_failure() {
        let dir = seed();
        let uri = format!("/uploads/{}", "a".repeat(300));
        let res = app(dir.path(), AllowedOrigins::Any)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let failure = res.extensions().get::<HandlerFailure>().unwrap();
        assert_eq!(failure.message, ASSET_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_server_error_marked_once() {
        let res = mark_server_errors(StatusCode::SERVICE_UNAVAILABLE.into_response()).await;
        let failure = res.extensions().get::<HandlerFailure>().unwrap();
        assert_eq!(failure.status, StatusCode::SERVICE_UNAVAILABLE);

        let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        res.extensions_mut().insert(HandlerFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "disk gone".into(),
        });
        let res = mark_server_errors(res).await;
        assert_eq!(res.extensions().get::<HandlerFailure>().unwrap().message, "disk gone");

        let res = mark_server_errors(StatusCode::NOT_FOUND.into_response()).await;
        assert!(res.extensions().get::<HandlerFailure>().is_none());
    }
}
