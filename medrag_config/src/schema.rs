use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const INDEX_PATH_ENV: &str = "MEDRAG_INDEX_PATH";
/// Value written by `medrag init`; treated as "no key".
pub const API_KEY_PLACEHOLDER: &str = "your-openai-api-key-here";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "OpenAiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "OpenAiConfig::default_chat_model")]
    pub chat_model: String,
    #[serde(default = "OpenAiConfig::default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "OpenAiConfig::default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    /// Delays between generation retries; empty means a single attempt
    #[serde(default)]
    pub retry_delays_secs: Vec<u64>,
}

impl OpenAiConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    fn default_chat_model() -> String {
        "gpt-4o-mini".to_string()
    }

    fn default_embedding_model() -> String {
        "text-embedding-3-small".to_string()
    }

    const fn default_embedding_dimensions() -> usize {
        1536
    }

    /// A key is usable when it is non-blank and not the init placeholder.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }

    /// The key if usable, otherwise an empty string.
    #[must_use]
    pub fn usable_api_key(&self) -> &str {
        if self.has_api_key() {
            self.api_key.trim()
        } else {
            ""
        }
    }

    #[must_use]
    pub fn masked_api_key(&self) -> String {
        if !self.has_api_key() {
            return "(not set)".to_string();
        }
        let chars: Vec<char> = self.api_key.trim().chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        } else {
            "***".to_string()
        }
    }

    #[must_use]
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "IndexConfig::default_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl IndexConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("vectorstore/db_index")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

impl DatabaseConfig {
    fn default_url() -> String {
        dirs::home_dir().map_or_else(
            || "sqlite://sessions.db?mode=rwc".to_string(),
            |home| {
                format!(
                    "sqlite://{}?mode=rwc",
                    home.join("medrag").join("sessions.db").display()
                )
            },
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "PipelineConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub show_sources: bool,
    #[serde(default)]
    pub condense_question: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: Self::default_request_timeout_secs(),
            show_sources: false,
            condense_question: false,
        }
    }
}

impl PipelineConfig {
    const fn default_request_timeout_secs() -> u64 {
        60
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        5000
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "providers": {
    "openai": {
      "api_key": "your-openai-api-key-here",
      "base_url": "https://api.openai.com/v1",
      "chat_model": "gpt-4o-mini",
      "embedding_model": "text-embedding-3-small",
      "embedding_dimensions": 1536,
      "retry_delays_secs": []
    }
  },
  "index": {
    "path": "vectorstore/db_index"
  },
  "pipeline": {
    "request_timeout_secs": 60,
    "show_sources": false,
    "condense_question": false
  },
  "server": {
    "host": "0.0.0.0",
    "port": 5000
  }
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("medrag"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load `~/medrag/config.json` and apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'medrag init' to create config.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `OPENAI_API_KEY` and `MEDRAG_INDEX_PATH` style overrides.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            info!("Using API key from {API_KEY_ENV}");
            self.providers.openai.api_key = key;
        }
        if let Some(path) = lookup(INDEX_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            info!("Using index path from {INDEX_PATH_ENV}: {path}");
            self.index.path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.providers.openai.embedding_dimensions == 0 {
            anyhow::bail!("providers.openai.embedding_dimensions must be greater than zero");
        }
        if self.pipeline.request_timeout_secs == 0 {
            anyhow::bail!("pipeline.request_timeout_secs must be greater than zero");
        }
        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than zero");
        }
        Ok(())
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");
        Self::create_config_at(&config_path)?;
        Ok(config_path)
    }

    /// Write the config template, refusing to overwrite an existing file.
    pub fn create_config_at(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                path.display()
            );
        }
        std::fs::write(path, CONFIG_TEMPLATE)?;
        info!("Created config file at: {}", path.display());
        Ok(())
    }
}
