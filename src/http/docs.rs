//! Interactive API documentation.
//!
//! `/api-docs.json` serves the OpenAPI document; `/api-docs` serves a Swagger
//! UI page that loads it. The page carries its own content security policy,
//! which the security-header stage leaves in place.

use axum::{
    http::{header, HeaderValue},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use utoipa::OpenApi;

use crate::http::response::{ErrorEnvelope, NotFoundBody};
use crate::routing::groups::{HealthStatus, ServiceInfo};
use crate::routing::router::WelcomeMessage;

pub const DOCS_PATH: &str = "/api-docs";
pub const SPEC_PATH: &str = "/api-docs.json";

const SWAGGER_UI_VERSION: &str = "5.17.14";

const DOCS_CSP: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' https://unpkg.com; \
    style-src 'self' 'unsafe-inline' https://unpkg.com; \
    img-src 'self' data: https:; \
    connect-src 'self'";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warrity API",
        version = "1.0.0",
        description = "Warranty tracking service"
    ),
    paths(
        crate::routing::router::root,
        crate::routing::groups::health,
        crate::routing::groups::service_info
    ),
    components(schemas(WelcomeMessage, HealthStatus, ServiceInfo, ErrorEnvelope, NotFoundBody)),
    tags((name = "service", description = "Service status and metadata"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

pub async fn swagger_page() -> impl IntoResponse {
    let page = format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Warrity API Documentation</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@{version}/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@{version}/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{document}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##,
        version = SWAGGER_UI_VERSION,
        document = SPEC_PATH,
    );

    (
        [(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(DOCS_CSP),
        )],
        Html(page),
    )
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(DOCS_PATH, get(swagger_page))
        .route(SPEC_PATH, get(openapi_json))
}
