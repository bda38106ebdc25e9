//! Fixed-window rate limiting, the fourth ingress stage.
//!
//! # Responsibilities
//! - Count requests under `/api` per client identity
//! - Reject with 429 once a client exceeds the window's ceiling
//! - Advertise the window through the standard `RateLimit-*` headers
//!
//! # Design Decisions
//! - Per-key entries in a `DashMap`; the shard lock makes increment-and-check
//!   atomic for concurrent requests from the same client
//! - A window starts on a client's first request and resets exactly at its
//!   boundary; rejected requests still count
//! - Expired windows are purged by a background sweep, not on the hot path

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::RateLimitSettings;
use crate::http::context::client_ip;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

pub const REJECTION_MESSAGE: &str = "Too many requests from this IP, please try again later";

const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");
const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Counter for one client inside its current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window rolls over.
    pub reset_after: Duration,
    pub exceeded: bool,
}

impl RateLimitStatus {
    fn reset_secs(&self) -> u64 {
        // Round up so a client never retries a fraction too early.
        let millis = self.reset_after.as_millis() as u64;
        millis.div_ceil(1000)
    }

    /// Write the `RateLimit-*` header set (plus `Retry-After` when exceeded).
    pub fn write_headers(&self, headers: &mut HeaderMap, window: Duration) {
        let reset = self.reset_secs();
        let pairs = [
            (RATELIMIT_POLICY, format!("{};w={}", self.limit, window.as_secs())),
            (RATELIMIT_LIMIT, self.limit.to_string()),
            (RATELIMIT_REMAINING, self.remaining.to_string()),
            (RATELIMIT_RESET, reset.to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
        if self.exceeded {
            headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(reset));
        }
    }
}

/// Shared fixed-window counter store.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            windows: DashMap::new(),
            window: settings.window(),
            max_requests: settings.max_requests,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `key` and report where it stands.
    pub fn check(&self, key: IpAddr) -> RateLimitStatus {
        let now = Instant::now();
        let mut entry = self.windows.entry(key).or_insert(Window {
            count: 0,
            resets_at: now + self.window,
        });

        if now >= entry.resets_at {
            entry.count = 0;
            entry.resets_at = now + self.window;
        }
        entry.count = entry.count.saturating_add(1);

        RateLimitStatus {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after: entry.resets_at.saturating_duration_since(now),
            exceeded: entry.count > self.max_requests,
        }
    }

    /// Drop windows that have already rolled over. Returns how many.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.resets_at > now);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Purge expired windows once per window length until shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: broadcast::Receiver<()>) {
        let limiter = Arc::clone(self);
        let period = self.window.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            let stop = shutdown::wait(shutdown);
            tokio::pin!(stop);
            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = ticker.tick() => {
                        let purged = limiter.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, remaining = limiter.tracked_clients(), "Purged rate limit windows");
                        }
                    }
                }
            }
        });
    }
}

/// State for the rate-limit stage.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub trust_proxy: bool,
}

/// Paths the limiter applies to: `/api` and everything below it.
pub fn is_limited_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_limited_path(request.uri().path()) {
        return next.run(request).await;
    }

    let key = client_ip(&request, state.trust_proxy);
    let status = state.limiter.check(key);
    let window = state.limiter.window();

    if status.exceeded {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": REJECTION_MESSAGE })),
        )
            .into_response();
        status.write_headers(response.headers_mut(), window);
        return response;
    }

    let mut response = next.run(request).await;
    status.write_headers(response.headers_mut(), window);
    response
}
