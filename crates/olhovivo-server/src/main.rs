//! Olho Vivo line-search proxy server
//!
//! This server provides:
//! - `GET /api/buscar?termos=...` which authenticates against SPTrans Olho Vivo and
//!   relays the line search result
//! - Liveness, readiness and Prometheus endpoints
//!
//! Usage:
//! ```bash
//! # With environment variables
//! SPTRANS_API_KEY=your_token olhovivo-server
//!
//! # With a config file (env vars override config)
//! olhovivo-server --config olhovivo.yaml
//!
//! # Validate configuration without starting
//! olhovivo-server --config olhovivo.yaml check-config
//! ```
//!
//! Test with:
//! ```bash
//! curl 'http://localhost:3000/api/buscar?termos=Lapa'
//! ```

mod app;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ServerConfig;
use olhovivo_observability::{Metrics, init_logging};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const VERSION_INFO: &str = concat!(env!("VERSION"), " (", env!("SHA"), ")");

/// Olho Vivo Proxy - SPTrans line search relay
#[derive(Parser)]
#[command(name = "olhovivo-server")]
#[command(about = "Proxy for the SPTrans Olho Vivo line search API", long_about = None)]
#[command(version = VERSION_INFO)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "OLHOVIVO_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config and OLHOVIVO_HOST)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Listen port (overrides config and OLHOVIVO_PORT)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy (default if no command specified)
    Serve,
    /// Print the effective configuration with secrets redacted
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    // CLI flags have the highest precedence
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    init_logging(&config.logging.level, config.logging.json)
        .context("Failed to initialize logging")?;

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&config),
        Some(Commands::Serve) | None => serve(config, cli.config).await,
    }
}

/// Print the effective configuration; fails when no usable token is configured
fn check_config(config: &ServerConfig) -> anyhow::Result<()> {
    let printed = serde_yaml::to_string(&config.redacted())
        .context("Failed to render configuration")?;
    println!("{}", printed);

    if config.api_token().is_some() {
        println!("✅ Upstream token: present");
        Ok(())
    } else {
        println!("❌ Upstream token: missing");
        anyhow::bail!("no upstream token configured (set SPTRANS_API_KEY or upstream.api_token)")
    }
}

async fn serve(config: ServerConfig, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    info!("🚀 Starting olhovivo-server {}", VERSION_INFO);
    match config_path {
        Some(path) => info!("📁 Configuration loaded from: {}", path.display()),
        None => info!("📁 Using default configuration"),
    }

    if config.logging.log_requests {
        info!("📋 Request logging enabled");
    }

    let metrics = Arc::new(Metrics::new().context("Failed to initialize metrics")?);
    let app = app::build_app(&config, metrics)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("✅ Olho Vivo proxy listening on http://{}", addr);
    info!("   - Line search:        http://{}/api/buscar?termos=...", addr);
    info!("   - Health check:       http://{}/healthz", addr);
    info!("   - Readiness check:    http://{}/readyz", addr);
    info!("   - Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
