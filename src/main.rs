//! Service Gateway
//!
//! Authenticating front door for independently deployed backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────────────┐
//!                         │                     SERVICE GATEWAY                     │
//!                         │                                                         │
//!   Client Request        │  ┌──────────┐   ┌──────────┐   ┌──────────────┐         │
//!   ──────────────────────┼─▶│ request  │──▶│   auth   │──▶│   routing    │         │
//!   Authorization: Bearer │  │ id/trace │   │   gate   │   │ (live table) │         │
//!                         │  └──────────┘   └────┬─────┘   └──────┬───────┘         │
//!                         │                      │ reject         │ match           │
//!                         │                      ▼                ▼                 │
//!   Client Response       │  ┌──────────────────────┐      ┌──────────────┐         │
//!   ◀─────────────────────┼──│ error envelope (JSON)│◀─────│    proxy     │◀────────┼── Backend
//!                         │  └──────────────────────┘      │  transport   │         │   Service
//!                         │                                └──────────────┘         │
//!                         │  ┌──────────────────────────────────────────────────┐  │
//!                         │  │  registry cache (TTL) ──▶ route refresher (swap)  │  │
//!                         │  └──────────────────────────────────────────────────┘  │
//!                         └────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use service_gateway::config::load_config;
use service_gateway::lifecycle::{signals, Shutdown};
use service_gateway::observability::{logging, metrics};
use service_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "JWT-authenticating gateway with registry-driven routes", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability);

    tracing::info!("service-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        registry_source = ?config.registry.source,
        registry_ttl_secs = config.registry.ttl_secs,
        collision_policy = ?config.routing.collision_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = GatewayServer::new(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
