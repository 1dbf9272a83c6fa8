use async_trait::async_trait;
use medrag_core::{ChatMessage, Embedder, LLMProvider, LLMResponse, Usage};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::retry::retry_with_backoff;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Client for OpenAI-compatible chat-completion and embedding endpoints.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
    retry_delays: Vec<Duration>,
}

impl OpenAiProvider {
    /// Convert f64 to f32 for embedding values
    /// Precision loss is acceptable for ML embeddings
    #[expect(clippy::cast_possible_truncation, reason = "ML embeddings use f32")]
    const fn f64_to_f32(x: f64) -> f32 {
        x as f32
    }

    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            retry_delays: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_chat_model(mut self, model: String) -> Self {
        self.chat_model = model;
        self
    }

    #[must_use]
    pub fn with_embedding_model(mut self, model: String, dimensions: usize) -> Self {
        self.embedding_model = model;
        self.embedding_dimensions = dimensions;
        self
    }

    /// Retry failed HTTP calls after each of these delays. Empty by default.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Helper method to send a single chat request
    async fn try_send(&self, request: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_chat_response(&response)
    }

    async fn try_embed(&self, request: &serde_json::Value) -> anyhow::Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_embedding_response(&response)
    }
}

fn usage_field(usage: &serde_json::Map<String, serde_json::Value>, key: &str) -> u32 {
    usage
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn parse_chat_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
        .to_string();

    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: usage_field(u, "prompt_tokens"),
        completion_tokens: usage_field(u, "completion_tokens"),
        total_tokens: usage_field(u, "total_tokens"),
    });

    Ok(LLMResponse { content, usage })
}

fn parse_embedding_response(response: &serde_json::Value) -> anyhow::Result<Vec<f32>> {
    response["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing embedding"))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(OpenAiProvider::f64_to_f32)
                .ok_or_else(|| anyhow::anyhow!("Invalid embedding value"))
        })
        .collect()
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse> {
        let request = json!({
            "model": model,
            "messages": messages,
        });

        info!("Sending chat request: model={model}, messages={}", messages.len());

        let response = retry_with_backoff(|| self.try_send(&request), &self.retry_delays).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        info!("Received chat response");
        Ok(response)
    }

    fn get_default_model(&self) -> &str {
        &self.chat_model
    }

    fn ensure_ready(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("OpenAI API key is not configured");
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let request = json!({
            "model": self.embedding_model,
            "input": text,
            "dimensions": self.embedding_dimensions,
        });

        debug!("Embedding {} chars with {}", text.len(), self.embedding_model);

        let embedding =
            retry_with_backoff(|| self.try_embed(&request), &self.retry_delays).await?;

        if embedding.len() != self.embedding_dimensions {
            anyhow::bail!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                self.embedding_dimensions
            );
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.embedding_dimensions
    }
}
