//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use warrity_api::config::AppConfig;
use warrity_api::lifecycle::{ensure_directories, Shutdown};
use warrity_api::observability::AccessLogSink;
use warrity_api::persistence::ConnectionMonitor;
use warrity_api::routing::Routes;
use warrity_api::HttpServer;

/// A server running on an ephemeral port, rooted in its own temp directory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config: AppConfig,
    pub root: tempfile::TempDir,
    task: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shut down the way the binary does: drain the server, then wait for the
    /// access-log writer to flush. Returns the temp root so the caller can
    /// inspect files written there before it is removed.
    pub async fn stop(mut self) -> tempfile::TempDir {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            task.await.unwrap();
        }
        if let Some(writer) = self.writer.take() {
            writer.await.unwrap();
        }
        let placeholder = tempfile::tempdir().unwrap();
        std::mem::replace(&mut self.root, placeholder)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Configuration built from `vars`, with paths under `root`.
pub fn config(vars: &[(&str, &str)], root: &Path) -> AppConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AppConfig::from_map(&vars, root)
}

/// Start a server serving `routes` from a fresh temp directory.
pub async fn spawn(vars: &[(&str, &str)], routes: Routes) -> TestServer {
    let root = tempfile::tempdir().unwrap();
    let config = config(vars, root.path());
    spawn_with(config, routes, root).await
}

pub async fn spawn_with(config: AppConfig, routes: Routes, root: tempfile::TempDir) -> TestServer {
    ensure_directories(&config).unwrap();
    let (access_log, writer) = AccessLogSink::for_environment(config.pipeline.environment, &config.log_dir)
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(
        config.clone(),
        Arc::new(ConnectionMonitor::new()),
        None,
        routes,
        access_log,
    );
    let server_shutdown = shutdown.clone();
    let task = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        config,
        root,
        task: Some(task),
        writer,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
