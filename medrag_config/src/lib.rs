mod schema;

pub use schema::{
    API_KEY_ENV, API_KEY_PLACEHOLDER, Config, DatabaseConfig, INDEX_PATH_ENV, IndexConfig,
    OpenAiConfig, PipelineConfig, ProvidersConfig, ServerConfig,
};
