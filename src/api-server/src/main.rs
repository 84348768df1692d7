//! Authorization server entrypoint
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `POLICY_SEED_PATH` - JSON file of bootstrap policy entries
//! - `RUST_LOG` - log filter (default: info)

use lattice_api_server::server::{run, ServerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    info!(
        version = lattice_authz::VERSION,
        port = config.port,
        "starting authorization server"
    );

    run(config).await
}
