//! Server configuration and lifecycle

use crate::models::PolicyEntry;
use crate::routes::create_router;
use crate::state::AppState;
use anyhow::Context;
use lattice_authz::policy::InMemoryPolicyStore;
use lattice_authz::types::PolicyRule;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Environment-driven server configuration.
///
/// - `PORT` - HTTP port (default 8080)
/// - `POLICY_SEED_PATH` - JSON file of bootstrap policy entries
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub seed_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(8080);
        let seed_path = std::env::var("POLICY_SEED_PATH").ok().map(PathBuf::from);

        Self { port, seed_path }
    }
}

/// Run the server until ctrl-c or SIGTERM.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let store = match &config.seed_path {
        Some(path) => {
            let rules = load_seed_rules(path)
                .with_context(|| format!("loading policy seed from {}", path.display()))?;
            info!(count = rules.len(), path = %path.display(), "policy seed loaded");
            InMemoryPolicyStore::with_rules(rules)
        }
        None => InMemoryPolicyStore::new(),
    };

    let state = AppState::new(Arc::new(store));
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    crate::middleware::log_startup(&addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shut down gracefully");
    Ok(())
}

/// Read bootstrap rules from a JSON file of wire policy entries.
fn load_seed_rules(path: &Path) -> anyhow::Result<Vec<PolicyRule>> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<PolicyEntry> = serde_json::from_str(&raw)?;

    entries
        .into_iter()
        .map(|entry| {
            entry
                .into_rule()
                .map_err(|err| anyhow::anyhow!("invalid seed entry: {err}"))
        })
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }

    info!("starting graceful shutdown");
}
