use medrag_config::Config;
use medrag_core::DocumentIndex;
use medrag_session::SessionManager;
use tracing::info;

use super::{build_index, build_provider};

/// Prints the effective configuration and checks the index and database.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let openai = &config.providers.openai;

        println!("=== medrag Configuration ===\n");

        println!("OpenAI:");
        println!("  API Key: {}", openai.masked_api_key());
        println!("  Base URL: {}", openai.base_url);
        println!("  Chat Model: {}", openai.chat_model);
        println!(
            "  Embedding Model: {} ({} dims)",
            openai.embedding_model, openai.embedding_dimensions
        );
        println!("  Retry Delays: {:?}", openai.retry_delays());
        println!();

        println!("Document Index:");
        println!("  Path: {}", config.index.path.display());
        info!("Loading document index");
        let index = build_index(&config, build_provider(&config));
        match index.ensure_loaded().await {
            Ok(count) => println!("  Status: Loaded ({count} passages)"),
            Err(e) => {
                println!("  Status: Unavailable");
                println!("  Error: {e}");
            }
        }
        println!();

        println!("Session Database:");
        println!("  URL: {}", config.database.url);
        info!("Testing database connection");
        Config::ensure_config_dir()?;
        match SessionManager::connect(&config.database.url).await {
            Ok(manager) => {
                let sessions = manager.list_sessions().await.map(|s| s.len()).unwrap_or(0);
                println!("  Status: Connected ({sessions} sessions)");
            }
            Err(e) => {
                println!("  Status: Connection failed");
                println!("  Error: {e}");
            }
        }
        println!();

        println!("Pipeline:");
        println!("  Request Timeout: {}s", config.pipeline.request_timeout_secs);
        println!("  Show Sources: {}", config.pipeline.show_sources);
        println!("  Condense Question: {}", config.pipeline.condense_question);
        println!();

        println!("Server:");
        println!("  Listen: {}:{}", config.server.host, config.server.port);

        Ok(())
    }
}
