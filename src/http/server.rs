//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the dispatch router: route groups, docs, static gateway,
//!   not-found fallback and the centralized error layer
//! - Put the dispatch router behind the ingress pipeline
//! - Bind to a listener and serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::{AppConfig, Environment};
use crate::http::pipeline::Pipeline;
use crate::http::{docs, static_files, terminal};
use crate::lifecycle::{shutdown, Shutdown};
use crate::observability::AccessLogSink;
use crate::persistence::{ConnectionMonitor, ConnectionState};
use crate::routing::Routes;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub connection: Arc<ConnectionMonitor>,
    /// `None` only when the server runs without a database (tests).
    pub database: Option<mongodb::Database>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        connection: Arc<ConnectionMonitor>,
        database: Option<mongodb::Database>,
    ) -> Self {
        Self {
            config,
            connection,
            database,
            started_at: Instant::now(),
        }
    }

    /// Whether the database was reached at startup.
    pub fn database_state(&self) -> ConnectionState {
        self.connection.state()
    }
}

/// Everything behind the pipeline: routes, docs, assets, then the catch-alls.
pub fn build_app(state: AppState, routes: Routes, pipeline: &Pipeline) -> Router {
    let pipeline_config = pipeline.config();

    let dispatch = routes.into_router().merge(docs::router::<AppState>());
    let dispatch = static_files::mount(
        dispatch,
        &pipeline_config.upload_dir,
        &pipeline_config.allowed_origins,
    )
    .fallback(terminal::not_found)
    .layer(CatchPanicLayer::custom(terminal::panic_response))
    .layer(middleware::from_fn_with_state(
        pipeline_config.environment,
        terminal::handle_errors,
    ))
    .with_state(state);

    catch_panics(pipeline.wrap(dispatch), pipeline_config.environment)
}

/// Outermost guard, so a panic in any ingress stage still gets the envelope.
fn catch_panics(router: Router, environment: Environment) -> Router {
    router.layer(CatchPanicLayer::custom(move |panic| {
        terminal::panic_envelope(environment, panic)
    }))
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create the server. `database` is the live connection handed to the
    /// route groups; `connection` reports its state.
    pub fn new(
        config: AppConfig,
        connection: Arc<ConnectionMonitor>,
        database: Option<mongodb::Database>,
        routes: Routes,
        access_log: AccessLogSink,
    ) -> Self {
        let config = Arc::new(config);
        let limiter = Arc::new(RateLimiter::new(config.pipeline.rate_limit));
        let pipeline = Pipeline::new(
            Arc::new(config.pipeline.clone()),
            limiter.clone(),
            access_log,
        );

        let state = AppState::new(config.clone(), connection, database);
        let router = build_app(state, routes, &pipeline);

        Self {
            router,
            config,
            limiter,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = self.config.pipeline.environment.as_str(),
            "HTTP server starting"
        );

        self.limiter.spawn_sweeper(shutdown.subscribe());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown.subscribe()))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
