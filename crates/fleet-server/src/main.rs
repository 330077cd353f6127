mod api;
mod config;
mod error;
mod state;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fleet_core::registry::DeviceRegistry;
use tracing::info;

use crate::config::{Overrides, Settings};
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "fleet-server", about = "Fleet device metrics server")]
struct Args {
    /// Path to the devices CSV file
    #[arg(long, env = "DEVICES_CSV")]
    csv: Option<PathBuf>,

    /// Server port number
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(long, env = "FLEET_HOST")]
    host: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long, env = "FLEET_CONFIG", default_value = "fleet.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let file_config = config::load_or_default(&args.config);
    let settings = Settings::resolve(
        Overrides {
            csv: args.csv,
            host: args.host,
            port: args.port,
        },
        file_config,
    );

    info!(csv = %settings.devices_csv.display(), listen = %settings.listen_addr(), "Fleet metrics server starting");

    // The device set is fixed before any traffic is accepted
    let registry = DeviceRegistry::new();
    registry
        .load_devices_from_csv(&settings.devices_csv)
        .with_context(|| {
            format!(
                "Failed to load devices from {}",
                settings.devices_csv.display()
            )
        })?;

    let state = AppState::new(registry);
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.listen_addr()).await?;
    info!(addr = %settings.listen_addr(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Gracefully shutting down...");
}
