#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Hosted chat-completion model.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse>;
    fn get_default_model(&self) -> &str;

    /// Report whether the provider can serve requests at all (e.g. a
    /// credential is present). Called before a pipeline is assembled.
    fn ensure_ready(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Text embedding model used to turn queries into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Where a retrieved passage came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A chunk of corpus text returned by the document index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    #[serde(default)]
    pub metadata: PassageMetadata,
    /// Cosine similarity to the query, higher is closer
    #[serde(default)]
    pub score: f32,
}

impl Passage {
    #[must_use]
    pub fn new(text: impl Into<String>, metadata: PassageMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
            score: 0.0,
        }
    }

    /// Short human-readable label such as `guide.pdf p.12`.
    #[must_use]
    pub fn source_label(&self) -> String {
        match (&self.metadata.source, self.metadata.page) {
            (Some(source), Some(page)) => format!("{source} p.{page}"),
            (Some(source), None) => source.clone(),
            (None, Some(page)) => format!("p.{page}"),
            (None, None) => "unknown source".to_string(),
        }
    }
}

/// Nearest-neighbour search over the embedded corpus.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Make sure the index is available and return how many passages it holds.
    async fn ensure_loaded(&self) -> anyhow::Result<usize>;

    /// Return up to `k` passages ordered from most to least similar.
    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Passage>>;
}

#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_or_create(&self, id: &Uuid) -> anyhow::Result<Session>;
    async fn add_message(&self, id: &Uuid, role: Role, content: &str) -> anyhow::Result<()>;
    async fn clear_session(&self, id: &Uuid) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    #[must_use]
    pub fn empty(id: Uuid) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
