#![allow(dead_code)]

use async_trait::async_trait;
use medrag_core::{
    ChatMessage, DocumentIndex, LLMProvider, LLMResponse, Passage, PassageMetadata,
};
use std::sync::Mutex;
use std::time::Duration;

pub const CONDENSED_QUESTION: &str = "What are the symptoms of diabetes?";
pub const SUMMARY_TEXT: &str = "The user asked several questions about diabetes.";

/// Generator that answers from a script and records every prompt.
#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub missing_key: bool,
    pub fail: bool,
    /// Fail only the history summarization calls
    pub summary_fails: bool,
    /// Fixed answer text instead of the numbered default
    pub reply: Option<String>,
    pub delay: Duration,
}

impl FakeGenerator {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn answer_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains("Answer:"))
            .collect()
    }

    pub fn summary_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains("# New summary"))
            .collect()
    }
}

#[async_trait]
impl LLMProvider for FakeGenerator {
    async fn chat(&self, messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let answered = {
            let mut prompts = self
                .prompts
                .lock()
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            prompts.push(prompt.clone());
            prompts.len()
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            anyhow::bail!("401 Unauthorized");
        }

        let content = if prompt.contains("Standalone question:") {
            CONDENSED_QUESTION.to_string()
        } else if prompt.contains("# New summary") {
            if self.summary_fails {
                anyhow::bail!("502 Bad Gateway");
            }
            SUMMARY_TEXT.to_string()
        } else {
            self.reply
                .clone()
                .unwrap_or_else(|| format!("Answer {answered}"))
        };
        Ok(LLMResponse {
            content,
            usage: None,
        })
    }

    fn get_default_model(&self) -> &str {
        "fake-model"
    }

    fn ensure_ready(&self) -> anyhow::Result<()> {
        if self.missing_key {
            anyhow::bail!("OpenAI API key is not configured");
        }
        Ok(())
    }
}

/// Index over a fixed set of passages that records the queries it sees.
pub struct FakeIndex {
    pub passages: Vec<Passage>,
    pub available: bool,
    /// Loads fine but every search errors
    pub search_fails: bool,
    pub queries: Mutex<Vec<String>>,
    pub requested: Mutex<Vec<usize>>,
}

impl FakeIndex {
    pub fn medical() -> Self {
        let passage = |text: &str, page| {
            Passage::new(
                text,
                PassageMetadata {
                    source: Some("encyclopedia.pdf".to_string()),
                    page: Some(page),
                },
            )
        };
        Self {
            passages: vec![
                passage("Diabetes is a chronic disease of high blood glucose.", 212),
                passage("Common symptoms include thirst and frequent urination.", 213),
            ],
            available: true,
            search_fails: false,
            queries: Mutex::new(Vec::new()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn absent() -> Self {
        Self {
            available: false,
            ..Self::medical()
        }
    }

    pub fn failing_search() -> Self {
        Self {
            search_fails: true,
            ..Self::medical()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn requested_k(&self) -> Vec<usize> {
        self.requested.lock().map(|k| k.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn ensure_loaded(&self) -> anyhow::Result<usize> {
        if !self.available {
            anyhow::bail!("No vector store found at path: vectorstore/db_index");
        }
        Ok(self.passages.len())
    }

    async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Passage>> {
        self.ensure_loaded().await?;
        if self.search_fails {
            anyhow::bail!("index read failed");
        }
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(k);
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

/// Conversation whose answers are long enough to overflow summary memory.
pub fn verbose_conversation(pairs: usize) -> Vec<ChatMessage> {
    (0..pairs)
        .flat_map(|i| {
            [
                ChatMessage::user(format!("question {i}")),
                ChatMessage::assistant(format!("answer {i} {}", "detail ".repeat(200))),
            ]
        })
        .collect()
}

pub fn conversation(pairs: usize) -> Vec<ChatMessage> {
    (0..pairs)
        .flat_map(|i| {
            [
                ChatMessage::user(format!("question {i}")),
                ChatMessage::assistant(format!("answer {i}")),
            ]
        })
        .collect()
}
