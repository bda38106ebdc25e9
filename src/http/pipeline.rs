//! The ingress pipeline.
//!
//! # Responsibilities
//! - Hold the fixed, ordered list of ingress stages
//! - Wrap a dispatch router so every request crosses every stage in order
//!
//! # Design Decisions
//! - The order is data ([`Stage::ORDER`]), not registration side effects
//! - Stateful dependencies (limiter, log sink) are injected, so each test
//!   builds a pipeline with fresh counters and its own sink
//! - Layers are applied innermost first; stage 1 ends up outermost

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;

use crate::config::PipelineConfig;
use crate::observability::access_log::{access_log_middleware, AccessLogSink};
use crate::security::{
    cors, headers, limits,
    rate_limit::{rate_limit_middleware, RateLimitState},
    BodyLimits, RateLimiter,
};

/// One ingress stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SecurityHeaders,
    Compression,
    Cors,
    RateLimit,
    BodyParser,
    AccessLog,
}

impl Stage {
    /// Request order, first to last.
    pub const ORDER: [Stage; 6] = [
        Stage::SecurityHeaders,
        Stage::Compression,
        Stage::Cors,
        Stage::RateLimit,
        Stage::BodyParser,
        Stage::AccessLog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::SecurityHeaders => "security-headers",
            Stage::Compression => "compression",
            Stage::Cors => "cors",
            Stage::RateLimit => "rate-limit",
            Stage::BodyParser => "body-parser",
            Stage::AccessLog => "access-log",
        }
    }

    /// Wrap `router` in this stage.
    fn apply(self, router: Router, pipeline: &Pipeline) -> Router {
        let config = &pipeline.config;
        match self {
            Stage::SecurityHeaders => headers::apply(router),
            Stage::Compression => router.layer(CompressionLayer::new()),
            Stage::Cors => cors::apply(router, &config.allowed_origins),
            Stage::RateLimit => router.layer(middleware::from_fn_with_state(
                RateLimitState {
                    limiter: pipeline.limiter.clone(),
                    trust_proxy: config.trust_proxy,
                },
                rate_limit_middleware,
            )),
            Stage::BodyParser => limits::apply(
                router,
                BodyLimits {
                    max_bytes: config.body_limit,
                    trust_proxy: config.trust_proxy,
                },
            ),
            Stage::AccessLog => router.layer(middleware::from_fn_with_state(
                pipeline.access_log.clone(),
                access_log_middleware,
            )),
        }
    }
}

/// The assembled ingress pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    limiter: Arc<RateLimiter>,
    access_log: AccessLogSink,
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>, limiter: Arc<RateLimiter>, access_log: AccessLogSink) -> Self {
        Self {
            config,
            limiter,
            access_log,
        }
    }

    /// Pipeline with a fresh limiter and console access log.
    pub fn with_defaults(config: PipelineConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self::new(Arc::new(config), limiter, AccessLogSink::Console)
    }

    pub fn stages(&self) -> &'static [Stage] {
        &Stage::ORDER
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Put `router` behind every stage.
    pub fn wrap(&self, router: Router) -> Router {
        self.stages().iter().rev().fold(router, |router, stage| {
            tracing::trace!(stage = stage.name(), "Installing ingress stage");
            stage.apply(router, self)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllowedOrigins, RateLimitSettings};
    use crate::http::context::RequestContext;
    use axum::{
        body::Body,
        extract::{connect_info::MockConnectInfo, Extension},
        http::{header, Request, StatusCode},
        routing::get,
    };
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn config(max_requests: u32) -> PipelineConfig {
        PipelineConfig {
            allowed_origins: AllowedOrigins::List(vec!["https://app.warrity.com".into()]),
            rate_limit: RateLimitSettings {
                window_ms: 60_000,
                max_requests,
            },
            ..PipelineConfig::default()
        }
    }

    fn app(pipeline: &Pipeline) -> Router {
        let router = Router::new().route(
            "/api/warranties",
            get(|Extension(ctx): Extension<RequestContext>| async move { ctx.client_ip.to_string() }),
        );
        pipeline
            .wrap(router)
            .layer(MockConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5000))))
    }

    fn request(origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/warranties");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_fixed_order() {
        let pipeline = Pipeline::with_defaults(config(10));
        let names: Vec<_> = pipeline.stages().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["security-headers", "compression", "cors", "rate-limit", "body-parser", "access-log"]
        );
    }

    #[tokio::test]
    async fn test_handler_sees_context() {
        let pipeline = Pipeline::with_defaults(config(10));
        let res = app(&pipeline).oneshot(request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        assert_eq!(res.headers()["ratelimit-limit"], "10");

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"198.51.100.4");
    }

    #[tokio::test]
    async fn test_cors_rejection_not_counted() {
        let pipeline = Pipeline::with_defaults(config(10));
        for _ in 0..3 {
            let res = app(&pipeline)
                .oneshot(request(Some("https://evil.example")))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::FORBIDDEN);
            assert_eq!(res.headers()["x-frame-options"], "SAMEORIGIN");
        }
        assert_eq!(pipeline.limiter().tracked_clients(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_rejection_keeps_headers() {
        let pipeline = Pipeline::with_defaults(config(1));
        let first = app(&pipeline).oneshot(request(None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app(&pipeline).oneshot(request(None)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["x-content-type-options"], "nosniff");
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }
}
