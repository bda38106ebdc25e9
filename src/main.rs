//! Warrity API server.
//!
//! # Startup
//!
//! ```text
//!   .env / environment ──▶ AppConfig ──▶ logging ──▶ logs/ + uploads/ exist?
//!                                                          │
//!                                                          ▼
//!                                                 connect to MongoDB ──▶ failure: exit 1
//!                                                          │
//!                                                          ▼
//!                               access-log sink ──▶ HttpServer ──▶ bind ──▶ serve
//!                                                                            │
//!                                                   Ctrl-C / SIGTERM ──▶ drain, exit 0
//! ```
//!
//! The listener is only bound once the database answered, so a failed
//! connection means no request is ever accepted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use warrity_api::config::{load_dotenv, loader, AppConfig, Environment};
use warrity_api::lifecycle::{ensure_directories, Shutdown};
use warrity_api::observability::{logging, metrics, AccessLogSink};
use warrity_api::persistence::{self, connector, ConnectOptions, ConnectionMonitor};
use warrity_api::routing::Routes;
use warrity_api::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "warrity-api", version)]
#[command(about = "Warrity warranty tracking API server", long_about = None)]
struct Cli {
    /// Read environment variables from this file instead of `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Print the resolved configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_files = load_dotenv(cli.env_file.as_deref());

    // Logging goes to stdout, which --print-config keeps for the JSON alone.
    if !cli.print_config {
        let environment = Environment::parse(std::env::var(loader::NODE_ENV).ok().as_deref());
        logging::init(environment);
    }

    let config = AppConfig::from_env()?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!("warrity-api v{} starting", env!("CARGO_PKG_VERSION"));
    for file in &env_files {
        tracing::debug!(path = %file.display(), "Loaded environment file");
    }

    tracing::info!(
        environment = config.pipeline.environment.as_str(),
        bind_address = %config.server.bind_address(),
        upload_dir = %config.pipeline.upload_dir.display(),
        rate_limit_window_ms = config.pipeline.rate_limit.window_ms,
        rate_limit_max = config.pipeline.rate_limit.max_requests,
        "Configuration loaded"
    );

    for dir in ensure_directories(&config)? {
        tracing::info!(path = %dir.display(), "Created directory");
    }

    if let Some(address) = &config.observability.metrics_address {
        match address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %address, "Failed to parse metrics address"),
        }
    }

    let monitor = Arc::new(ConnectionMonitor::new());
    let options = ConnectOptions::from(&config.database);
    let connection = match persistence::connect(&config.database.uri, &options, &monitor).await {
        Ok(connection) => connection,
        Err(e) => {
            connector::report_failure(&config.database.uri, &e);
            std::process::exit(1);
        }
    };

    let (access_log, access_log_writer) =
        AccessLogSink::for_environment(config.pipeline.environment, &config.log_dir).await?;

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(
        config,
        monitor,
        Some(connection.database),
        Routes::with_builtin(),
        access_log,
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown).await?;

    // The server owned every sink clone, so the writer now drains and ends.
    if let Some(writer) = access_log_writer {
        if let Err(e) = writer.await {
            tracing::warn!(error = %e, "Access log writer did not finish");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
