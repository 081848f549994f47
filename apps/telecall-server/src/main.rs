//! Telecall Server - standalone server for the media session pipeline.
//!
//! Terminates carrier WebSocket/HTTP media stream connections, runs them
//! through the transcription and insights pipeline, and serves the
//! resulting push-channel and persistence API over HTTP.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use telecall_core::{bootstrap_services, start_server, AppStateBuilder};
use tokio::signal;

use crate::config::ServerConfig;

/// Telecall Server - headless media session pipeline server.
#[derive(Parser, Debug)]
#[command(name = "telecall-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "TELECALL_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind address (overrides config file).
    #[arg(long, env = "TELECALL_BIND_ADDR")]
    bind_addr: Option<std::net::IpAddr>,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "TELECALL_BIND_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Telecall Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(port) = args.port {
        config.bind_port = port;
    }

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    log::info!(
        "Configuration: bind={}:{}, sample_rate={}, audio_buffer_seconds={}",
        config.bind_addr,
        config.bind_port,
        core_config.sample_rate,
        core_config.audio_buffer_seconds
    );

    let services = bootstrap_services(core_config).context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let app_state = AppStateBuilder::new()
        .session_manager(services.session_manager.clone())
        .shutdown(services.shutdown.clone())
        .build();

    let addr = SocketAddr::new(config.bind_addr, config.bind_port);
    let server_handle = tokio::spawn(async move {
        if let Err(err) = start_server(app_state, addr).await {
            log::error!("Server error: {err}");
        }
    });

    log::info!("HTTP server started on {addr}");

    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown.cancel();
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
