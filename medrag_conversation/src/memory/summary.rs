use medrag_core::{ChatMessage, LLMProvider};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::MemoryError;
use crate::prompt;

/// Rough token estimate, four characters per token.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Folds conversation lines into a running summary with a model call.
#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn LLMProvider>,
    model: String,
    timeout: Duration,
}

impl Summarizer {
    #[must_use]
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    pub async fn summarize(
        &self,
        current_summary: &str,
        new_lines: &[ChatMessage],
    ) -> Result<String, MemoryError> {
        let request = [ChatMessage::user(prompt::summary_prompt(
            current_summary,
            new_lines,
        ))];

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&request, &self.model))
            .await
            .map_err(|_| MemoryError::Timeout(self.timeout))?
            .map_err(MemoryError::Compression)?;

        let summary = response.content.trim().to_string();
        if summary.is_empty() {
            return Err(MemoryError::Compression(anyhow::anyhow!(
                "summarizer returned an empty summary"
            )));
        }

        debug!(
            "Summarized {} lines: {} -> {} chars",
            new_lines.len(),
            current_summary.len(),
            summary.len()
        );
        Ok(summary)
    }
}

/// Running summary of older turns plus recent turns kept verbatim.
///
/// Verbatim messages are held while they fit in `token_budget`; once the
/// budget is exceeded the oldest ones are folded into the summary by
/// [`SummaryMemory::prune`].
#[derive(Clone)]
pub struct SummaryMemory {
    token_budget: usize,
    summary: String,
    buffer: VecDeque<ChatMessage>,
    summarizer: Summarizer,
}

impl SummaryMemory {
    #[must_use]
    pub const fn new(token_budget: usize, summarizer: Summarizer) -> Self {
        Self {
            token_budget,
            summary: String::new(),
            buffer: VecDeque::new(),
            summarizer,
        }
    }

    #[must_use]
    pub const fn token_budget(&self) -> usize {
        self.token_budget
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.buffer.push_back(message);
    }

    #[must_use]
    pub fn buffer_tokens(&self) -> usize {
        self.buffer.iter().map(|m| estimate_tokens(&m.content)).sum()
    }

    /// Fold the oldest verbatim messages into the summary until the rest fit.
    ///
    /// Leaves the memory untouched when the summarizer fails.
    pub async fn prune(&mut self) -> Result<(), MemoryError> {
        let mut remaining = self.buffer_tokens();
        if remaining <= self.token_budget {
            return Ok(());
        }

        let mut drop_count = 0;
        for message in &self.buffer {
            if remaining <= self.token_budget {
                break;
            }
            remaining -= estimate_tokens(&message.content);
            drop_count += 1;
        }

        let pruned: Vec<ChatMessage> = self.buffer.iter().take(drop_count).cloned().collect();
        let summary = self.summarizer.summarize(&self.summary, &pruned).await?;

        self.buffer.drain(..drop_count);
        self.summary = summary;
        debug!(
            "Folded {drop_count} messages into summary, {} verbatim remain",
            self.buffer.len()
        );
        Ok(())
    }

    /// Summary (as a system message) followed by the verbatim messages.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.buffer.len() + 1);
        if !self.summary.is_empty() {
            messages.push(ChatMessage::system(self.summary.clone()));
        }
        messages.extend(self.buffer.iter().cloned());
        messages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medrag_core::LLMResponse;
    use std::sync::Mutex;

    struct ScriptedSummarizer {
        reply: anyhow::Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedSummarizer {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(anyhow::anyhow!("connection refused")),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedSummarizer {
        async fn chat(&self, messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.extend(messages.iter().map(|m| m.content.clone()));
            }
            match &self.reply {
                Ok(text) => Ok(LLMResponse {
                    content: text.clone(),
                    usage: None,
                }),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        fn get_default_model(&self) -> &str {
            "test-model"
        }
    }

    fn memory_with(provider: Arc<ScriptedSummarizer>, budget: usize) -> SummaryMemory {
        SummaryMemory::new(
            budget,
            Summarizer::new(provider, "test-model", Duration::from_secs(5)),
        )
    }

    fn forty_chars(tag: char) -> String {
        std::iter::repeat_n(tag, 40).collect()
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[tokio::test]
    async fn under_budget_makes_no_model_call() {
        let provider = ScriptedSummarizer::replying("unused");
        let mut memory = memory_with(provider.clone(), 100);
        memory.push(ChatMessage::user("short"));
        memory.prune().await.unwrap_or_else(|e| panic!("{e}"));

        assert!(memory.summary().is_empty());
        assert_eq!(memory.messages().len(), 1);
        assert!(provider.prompts.lock().map(|p| p.is_empty()).unwrap_or(false));
    }

    #[tokio::test]
    async fn overflow_folds_oldest_messages() {
        let provider = ScriptedSummarizer::replying("User asked about a and b.");
        let mut memory = memory_with(provider.clone(), 10);
        memory.push(ChatMessage::user(forty_chars('a')));
        memory.push(ChatMessage::assistant(forty_chars('b')));
        memory.push(ChatMessage::user(forty_chars('c')));
        memory.prune().await.unwrap_or_else(|e| panic!("{e}"));

        let messages = memory.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("User asked about a and b."));
        assert_eq!(messages[1].content, forty_chars('c'));

        let prompts = provider.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(&forty_chars('a')));
        assert!(!prompts[0].contains(&forty_chars('c')));
    }

    #[tokio::test]
    async fn failed_summary_leaves_memory_unchanged() {
        let mut memory = memory_with(ScriptedSummarizer::failing(), 10);
        memory.push(ChatMessage::user(forty_chars('a')));
        memory.push(ChatMessage::assistant(forty_chars('b')));

        let result = memory.prune().await;
        assert!(matches!(result, Err(MemoryError::Compression(_))));
        assert_eq!(memory.messages().len(), 2);
        assert!(memory.summary().is_empty());
    }
}
