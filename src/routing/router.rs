//! Route-group dispatch.
//!
//! # Responsibilities
//! - Name the fixed set of route groups and their mount prefixes
//! - Resolve a path to its group, longest prefix first
//! - Assemble the mounted groups plus the root endpoint into one router
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - No validation or business logic; groups own their input checks
//! - Explicit `None` for paths outside every group

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::http::context::RequestContext;
use crate::http::server::AppState;
use crate::routing::matcher::PathPrefixMatcher;

/// A cohesive set of handlers for one resource area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteGroup {
    Auth,
    Users,
    Warranties,
    Products,
    Events,
    Admin,
    Health,
    Upload,
    ServiceInfo,
}

impl RouteGroup {
    pub const ALL: [RouteGroup; 9] = [
        RouteGroup::Auth,
        RouteGroup::Users,
        RouteGroup::Warranties,
        RouteGroup::Products,
        RouteGroup::Events,
        RouteGroup::Admin,
        RouteGroup::Health,
        RouteGroup::Upload,
        RouteGroup::ServiceInfo,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            RouteGroup::Auth => "/api/auth",
            RouteGroup::Users => "/api/users",
            RouteGroup::Warranties => "/api/warranties",
            RouteGroup::Products => "/api/products",
            RouteGroup::Events => "/api/events",
            RouteGroup::Admin => "/api/admin",
            RouteGroup::Health => "/api/health",
            RouteGroup::Upload => "/api/upload",
            RouteGroup::ServiceInfo => "/api/service-info",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RouteGroup::Auth => "auth",
            RouteGroup::Users => "users",
            RouteGroup::Warranties => "warranties",
            RouteGroup::Products => "products",
            RouteGroup::Events => "events",
            RouteGroup::Admin => "admin",
            RouteGroup::Health => "health",
            RouteGroup::Upload => "upload",
            RouteGroup::ServiceInfo => "service-info",
        }
    }
}

/// Prefix table, ordered longest prefix first.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<(PathPrefixMatcher, RouteGroup)>,
}

impl RouteTable {
    pub fn new(groups: impl IntoIterator<Item = RouteGroup>) -> Self {
        let mut entries: Vec<_> = groups
            .into_iter()
            .map(|group| (PathPrefixMatcher::new(group.prefix()), group))
            .collect();
        entries.sort_by(|(a, _), (b, _)| b.prefix().len().cmp(&a.prefix().len()));
        Self { entries }
    }

    /// Table over every known group.
    pub fn standard() -> Self {
        Self::new(RouteGroup::ALL)
    }

    /// The group owning `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<RouteGroup> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(path))
            .map(|(_, group)| *group)
    }
}

/// Record the matched group on the request context and on the response.
pub async fn tag_route_group(
    State(table): State<Arc<RouteTable>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let group = table.resolve(request.uri().path());
    if let Some(context) = request.extensions_mut().get_mut::<RequestContext>() {
        context.route_group = group;
    }

    let mut response = next.run(request).await;
    if let Some(group) = group {
        response.extensions_mut().insert(group);
    }
    response
}

/// Static payload served at `/`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WelcomeMessage {
    pub message: String,
    pub version: String,
}

pub const WELCOME_MESSAGE: &str = "Welcome to Warrity API";
pub const API_VERSION: &str = "1.0.0";

/// Root informational endpoint.
#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses((status = 200, description = "Service banner", body = WelcomeMessage))
)]
pub async fn root() -> Json<WelcomeMessage> {
    Json(WelcomeMessage {
        message: WELCOME_MESSAGE.to_string(),
        version: API_VERSION.to_string(),
    })
}

/// The set of mounted route groups.
///
/// Groups that are never mounted simply do not exist: their paths fall
/// through to the not-found handler.
#[derive(Default)]
pub struct Routes {
    groups: Vec<(RouteGroup, Router<AppState>)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `router` under `group`'s prefix, replacing any earlier mount.
    pub fn mount(mut self, group: RouteGroup, router: Router<AppState>) -> Self {
        self.groups.retain(|(g, _)| *g != group);
        self.groups.push((group, router));
        self
    }

    pub fn mounted(&self) -> Vec<RouteGroup> {
        self.groups.iter().map(|(g, _)| *g).collect()
    }

    /// Root endpoint plus every mounted group, each nested at its prefix.
    pub fn into_router(self) -> Router<AppState> {
        let table = Arc::new(RouteTable::standard());

        self.groups
            .into_iter()
            .fold(Router::new().route("/", get(root)), |router, (group, routes)| {
                tracing::debug!(group = group.name(), prefix = group.prefix(), "Mounting route group");
                router.nest(group.prefix(), routes)
            })
            .layer(middleware::from_fn_with_state(table, tag_route_group))
    }
}
