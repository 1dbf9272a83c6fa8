//! Static strategy pattern for CLI commands.
//!
//! Each command is its own strategy type with its own input, dispatched
//! statically from `main`.

use medrag_config::Config;
use medrag_conversation::{PipelineAssembler, PipelineSettings, SessionOrchestrator};
use medrag_core::SessionStorage;
use medrag_index::DiskIndex;
use medrag_providers::OpenAiProvider;
use std::sync::Arc;
use tracing::{info, warn};

mod ask;
mod info;
mod init;
mod serve;
mod version;

pub use ask::{AskInput, AskStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Contract shared by all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Build the OpenAI-compatible gateway used for both chat and embeddings.
fn build_provider(config: &Config) -> Arc<OpenAiProvider> {
    let openai = &config.providers.openai;
    if !openai.has_api_key() {
        warn!("No OpenAI API key configured; questions will be rejected until one is set");
    }

    Arc::new(
        OpenAiProvider::new(openai.usable_api_key().to_string())
            .with_base_url(openai.base_url.clone())
            .with_chat_model(openai.chat_model.clone())
            .with_embedding_model(openai.embedding_model.clone(), openai.embedding_dimensions)
            .with_retry_delays(openai.retry_delays()),
    )
}

fn build_index(config: &Config, provider: Arc<OpenAiProvider>) -> Arc<DiskIndex> {
    info!("Document index path: {}", config.index.path.display());
    Arc::new(DiskIndex::new(config.index.path.clone(), provider))
}

fn pipeline_settings(config: &Config) -> PipelineSettings {
    PipelineSettings::default()
        .with_model(config.providers.openai.chat_model.clone())
        .with_request_timeout(config.pipeline.request_timeout())
        .with_return_sources(config.pipeline.show_sources)
        .with_condense_question(config.pipeline.condense_question)
}

/// Wire the gateways, index and session storage into an orchestrator.
fn build_orchestrator(
    config: &Config,
    storage: Arc<dyn SessionStorage>,
) -> anyhow::Result<Arc<SessionOrchestrator>> {
    let provider = build_provider(config);
    let index = build_index(config, provider.clone());
    let assembler =
        PipelineAssembler::new(index, provider).with_settings(pipeline_settings(config))?;
    Ok(Arc::new(SessionOrchestrator::new(assembler, storage)))
}
