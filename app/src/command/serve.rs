use medrag_config::Config;
use medrag_session::SessionManager;
use medrag_web::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use super::build_orchestrator;

#[derive(Debug, Clone)]
pub struct ServeInput {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Runs the web chat server backed by persistent SQLite sessions.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        info!("Loaded config from ~/medrag/config.json");

        Config::ensure_config_dir()?;
        let storage = Arc::new(SessionManager::connect(&config.database.url).await?);
        let orchestrator = build_orchestrator(&config, storage)?;

        let host = input.host.unwrap_or_else(|| config.server.host.clone());
        let port = input.port.unwrap_or(config.server.port);
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {host}:{port}: {e}"))?;

        medrag_web::serve(AppState::new(orchestrator), addr).await
    }
}
