use std::future::IntoFuture;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use canopy_server::api::{AppState, router};
use canopy_server::config::CanopyConfig;
use canopy_server::state_factory::create_service;

/// Canopy quota service HTTP server.
#[derive(Parser, Debug)]
#[command(name = "canopy-server", about = "Standalone HTTP server for Canopy")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "canopy.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = Path::new(&cli.config);
    let config = CanopyConfig::load(config_path)?;

    let telemetry_guard = canopy_server::telemetry::init(&config.telemetry);

    if !config_path.exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let service = create_service(&config)?;
    info!(
        resources = service.supported_resources().len(),
        extensions = ?config.extensions.enabled,
        "quota service ready"
    );
    let app = router(AppState::new(service));

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "canopy-server listening");

    // Bound the drain of in-flight requests once a signal arrives.
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let (signalled_tx, mut signalled_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(true);
        })
        .into_future();
    let drain_deadline = async move {
        let _ = signalled_rx.wait_for(|signalled| *signalled).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result?,
        () = drain_deadline => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "shutdown timeout exceeded, dropping in-flight requests"
            );
        }
    }

    telemetry_guard.shutdown();
    info!("canopy-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
