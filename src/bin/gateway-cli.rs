use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use service_gateway::auth::{JwtVerifier, TokenVerifier};
use service_gateway::config::load_config;
use service_gateway::registry::{build_registry, RegistryCache};
use service_gateway::routing::RouteTable;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Offline checks against a gateway configuration", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a bearer token with the configured secret
    Verify {
        /// Token text, without the "Bearer " prefix
        token: String,
    },
    /// Fetch the registry once and print the resulting route table
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Verify { token } => {
            let verifier = JwtVerifier::new(&config.jwt)?;
            match verifier.verify(&token) {
                Ok(claims) => {
                    println!("{}", serde_json::to_string_pretty(&claims)?);
                }
                Err(e) => {
                    eprintln!("Error: token rejected ({}): {}", e.kind(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Routes => {
            let registry = build_registry(&config.registry)?;
            let cache = Arc::new(RegistryCache::from_config(registry, &config.registry));
            let snapshot = cache.get_services().await?;
            let table = RouteTable::build(
                &snapshot,
                &config.routing.api_prefix,
                config.routing.collision_policy,
            );
            let routes: Vec<_> = table
                .entries()
                .map(|e| json!({ "path": e.path_prefix, "service": e.service, "uri": e.target_uri }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&routes)?);
        }
    }

    Ok(())
}
