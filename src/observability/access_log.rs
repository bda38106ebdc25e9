//! Access logging, the last ingress stage.
//!
//! # Responsibilities
//! - Capture method, URL, status, size and latency of every request
//! - Production: append an Apache combined line to `logs/access.log`
//! - Development: emit a concise line on the console through `tracing`
//!
//! # Design Decisions
//! - One writer task owns the file; requests only push onto a channel, so a
//!   slow or failing disk never holds a response back
//! - Lines are appended in arrival order and never interleave

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Environment;
use crate::http::context::RequestContext;
use crate::observability::metrics;
use crate::routing::RouteGroup;

pub const ACCESS_LOG_FILE: &str = "access.log";

/// Destination for access-log lines.
#[derive(Debug, Clone)]
pub enum AccessLogSink {
    /// Concise lines through `tracing` (target `access`).
    Console,
    /// Combined-format lines appended to a file by a writer task.
    File(mpsc::UnboundedSender<String>),
}

impl AccessLogSink {
    /// Pick the sink for the runtime mode, opening `log_dir/access.log` in
    /// production.
    ///
    /// The returned handle is the file writer task, present only in
    /// production. Await it after the last sink clone is dropped so queued
    /// lines reach the file.
    pub async fn for_environment(
        environment: Environment,
        log_dir: &Path,
    ) -> std::io::Result<(Self, Option<JoinHandle<()>>)> {
        if environment.is_production() {
            let (sink, writer) = Self::open(&log_dir.join(ACCESS_LOG_FILE)).await?;
            Ok((sink, Some(writer)))
        } else {
            Ok((AccessLogSink::Console, None))
        }
    }

    /// Open `path` in append mode and spawn its writer task.
    ///
    /// The task ends once every clone of the returned sink is dropped.
    pub async fn open(path: &Path) -> std::io::Result<(Self, JoinHandle<()>)> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_lines(file, rx, path.to_path_buf()));

        tracing::info!(path = %path.display(), "Access log opened");
        Ok((AccessLogSink::File(tx), writer))
    }

    pub fn record(&self, entry: &AccessLogEntry) {
        match self {
            AccessLogSink::Console => {
                tracing::info!(
                    target: "access",
                    method = %entry.method,
                    url = %entry.url,
                    status = entry.status,
                    elapsed_ms = entry.elapsed.as_secs_f64() * 1000.0,
                    group = entry.route_group.map(RouteGroup::name).unwrap_or("-"),
                    "{}",
                    entry.dev()
                );
            }
            AccessLogSink::File(tx) => {
                if tx.send(entry.combined()).is_err() {
                    tracing::warn!("Access log writer stopped, dropping line");
                }
            }
        }
    }
}

async fn write_lines(mut file: tokio::fs::File, mut rx: mpsc::UnboundedReceiver<String>, path: PathBuf) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        let written = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        };
        if let Err(e) = written.await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to append access log line");
        }
    }
}

/// Everything a log line needs, captured around one request.
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub status: u16,
    pub content_length: Option<u64>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub elapsed: Duration,
    pub route_group: Option<RouteGroup>,
}

impl AccessLogEntry {
    /// Apache combined log format.
    pub fn combined(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} {}\" {} {} \"{}\" \"{}\"",
            self.remote_addr,
            self.timestamp.format("%d/%b/%Y:%H:%M:%S +0000"),
            self.method,
            self.url,
            self.http_version,
            self.status,
            self.length_or_dash(),
            self.referrer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// Short development format: `GET /api/health 200 1.234 ms - 42`.
    pub fn dev(&self) -> String {
        format!(
            "{} {} {} {:.3} ms - {}",
            self.method,
            self.url,
            self.status,
            self.elapsed.as_secs_f64() * 1000.0,
            self.length_or_dash(),
        )
    }

    fn length_or_dash(&self) -> String {
        self.content_length
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Stage 6: log the request once the inner stack has produced a response.
pub async fn access_log_middleware(
    State(sink): State<AccessLogSink>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let timestamp = Utc::now();
    let remote_addr = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.client_ip.to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().to_string();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let http_version = format!("{:?}", request.version());
    let referrer = header_string(request.headers(), header::REFERER);
    let user_agent = header_string(request.headers(), header::USER_AGENT);

    let response = next.run(request).await;

    let route_group = response.extensions().get::<RouteGroup>().copied();
    let content_length = header_string(response.headers(), header::CONTENT_LENGTH)
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact());

    let entry = AccessLogEntry {
        remote_addr,
        method,
        url,
        http_version,
        status: response.status().as_u16(),
        content_length,
        referrer,
        user_agent,
        timestamp,
        elapsed: start.elapsed(),
        route_group,
    };

    metrics::record_request(
        &entry.method,
        entry.status,
        route_group.map(RouteGroup::name).unwrap_or("none"),
        entry.elapsed,
    );
    sink.record(&entry);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> AccessLogEntry {
        AccessLogEntry {
            remote_addr: "203.0.113.7".to_string(),
            method: "GET".to_string(),
            url: "/api/health?verbose=1".to_string(),
            http_version: "HTTP/1.1".to_string(),
            status: 200,
            content_length: Some(42),
            referrer: None,
            user_agent: Some("curl/8.4.0".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            elapsed: Duration::from_micros(1_500),
            route_group: Some(RouteGroup::Health),
        }
    }

    #[test]
    fn test_combined_format() {
        assert_eq!(
            entry().combined(),
            "203.0.113.7 - - [09/Mar/2024:14:05:07 +0000] \"GET /api/health?verbose=1 HTTP/1.1\" 200 42 \"-\" \"curl/8.4.0\""
        );
    }

    #[test]
    fn test_dev_format() {
        let mut e = entry();
        e.content_length = None;
        assert_eq!(e.dev(), "GET /api/health?verbose=1 200 1.500 ms - -");
    }

    #[tokio::test]
    async fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACCESS_LOG_FILE);
        std::fs::write(&path, "existing line\n").unwrap();

        let (sink, writer) = AccessLogSink::open(&path).await.unwrap();
        sink.record(&entry());
        sink.record(&entry());
        drop(sink);
        writer.await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing line");
        assert!(lines[1].starts_with("203.0.113.7 - - ["));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_queued_lines_reach_file_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, writer) = AccessLogSink::for_environment(Environment::Production, dir.path())
            .await
            .unwrap();
        let writer = writer.expect("production opens a writer");

        for _ in 0..5_000 {
            sink.record(&entry());
        }
        drop(sink);
        writer.await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join(ACCESS_LOG_FILE)).unwrap();
        assert_eq!(contents.lines().count(), 5_000);
    }

    #[tokio::test]
    async fn test_console_has_no_writer() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, writer) = AccessLogSink::for_environment(Environment::Development, dir.path())
            .await
            .unwrap();
        assert!(matches!(sink, AccessLogSink::Console));
        assert!(writer.is_none());
        assert!(!dir.path().join(ACCESS_LOG_FILE).exists());
    }
}
