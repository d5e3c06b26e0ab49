use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slidegate::config::{LogFormat, LoggingConfig, SlidegateConfig};
use slidegate::http::HttpServer;
use slidegate::ratelimit::{spawn_sweeper, RateLimiter};

/// Command line arguments. Flags override file and environment settings.
#[derive(Parser, Debug)]
#[command(name = "slidegate")]
#[command(version, about = "Sliding-window request rate limiter for HTTP APIs")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Maximum requests per client per window
    #[arg(long)]
    max_requests: Option<u64>,

    /// Window length in seconds
    #[arg(long)]
    window_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = SlidegateConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if let Some(max_requests) = args.max_requests {
        config.rate_limiting.max_requests = max_requests;
    }
    if let Some(window_seconds) = args.window_seconds {
        config.rate_limiting.window_seconds = window_seconds;
    }

    init_tracing(&config.logging);

    info!("Starting Slidegate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    // Initialize the rate limiter
    let rate_limiter = Arc::new(RateLimiter::from_settings(&config.rate_limiting)?);
    info!(
        max_requests = rate_limiter.config().max_requests(),
        window_seconds = rate_limiter.config().window_seconds(),
        "Rate limiter initialized"
    );

    let sweeper = config
        .rate_limiting
        .sweep_interval_secs
        .filter(|&secs| secs > 0)
        .map(|secs| spawn_sweeper(rate_limiter.clone(), Duration::from_secs(secs)));

    let http_server = HttpServer::new(config.server.http_addr, rate_limiter);

    // Run the server with graceful shutdown on Ctrl+C
    http_server.serve_with_shutdown(shutdown_signal()).await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("Slidegate Rate Limiting Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
