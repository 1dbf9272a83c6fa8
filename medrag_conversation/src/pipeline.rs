//! Per-request pipeline assembly and answering.

use medrag_core::{ChatMessage, DocumentIndex, LLMProvider, Passage};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Component, PipelineError, Stage};
use crate::memory::{
    ConversationMemory, MemoryKind, PipelineConfiguration, Summarizer, build_memory,
    select_configuration,
};
use crate::prompt::{self, CONVERSATIONAL_PROMPT_TEMPLATE};

/// Settings shared by every pipeline an assembler builds.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Model name; `None` uses the provider default
    pub model: Option<String>,
    pub prompt_template: String,
    /// Upper bound for each external call
    pub request_timeout: Duration,
    /// Include retrieved passages in the answer result
    pub return_sources: bool,
    /// Rewrite follow-up questions into standalone ones before retrieval
    pub condense_question: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: None,
            prompt_template: CONVERSATIONAL_PROMPT_TEMPLATE.to_string(),
            request_timeout: Duration::from_secs(60),
            return_sources: false,
            condense_question: false,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_return_sources(mut self, enabled: bool) -> Self {
        self.return_sources = enabled;
        self
    }

    #[must_use]
    pub const fn with_condense_question(mut self, enabled: bool) -> Self {
        self.condense_question = enabled;
        self
    }
}

/// Result of one answered question.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub answer: String,
    /// Retrieved passages, present when sources are enabled
    pub source_passages: Option<Vec<Passage>>,
    /// Query actually sent to retrieval when it differs from the question
    pub standalone_question: Option<String>,
}

/// Builds a fresh [`Pipeline`] for every request.
///
/// Holds only shared, read-only handles; no conversation state lives here.
#[derive(Clone)]
pub struct PipelineAssembler {
    index: Arc<dyn DocumentIndex>,
    generator: Arc<dyn LLMProvider>,
    settings: PipelineSettings,
}

impl PipelineAssembler {
    #[must_use]
    pub fn new(index: Arc<dyn DocumentIndex>, generator: Arc<dyn LLMProvider>) -> Self {
        Self {
            index,
            generator,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Result<Self, PipelineError> {
        let missing = prompt::missing_placeholders(&settings.prompt_template);
        if !missing.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "prompt template is missing {}",
                missing.join(", ")
            )));
        }
        if settings.request_timeout.is_zero() {
            return Err(PipelineError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        self.settings = settings;
        Ok(self)
    }

    #[must_use]
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Whether the generation gateway can take requests at all.
    pub fn generator_ready(&self) -> anyhow::Result<()> {
        self.generator.ensure_ready()
    }

    fn model(&self) -> String {
        self.settings
            .model
            .clone()
            .unwrap_or_else(|| self.generator.get_default_model().to_string())
    }

    async fn check_dependencies(&self) -> Result<(), PipelineError> {
        self.generator
            .ensure_ready()
            .map_err(|e| PipelineError::Assembly {
                component: Component::Generator,
                reason: format!("{e:#}"),
            })?;

        let loaded = tokio::time::timeout(self.settings.request_timeout, self.index.ensure_loaded())
            .await
            .map_err(|_| PipelineError::Assembly {
                component: Component::DocumentIndex,
                reason: "timed out while loading the index".to_string(),
            })?;
        match loaded {
            Ok(0) => Err(PipelineError::Assembly {
                component: Component::DocumentIndex,
                reason: "index holds no passages".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(e) => Err(PipelineError::Assembly {
                component: Component::DocumentIndex,
                reason: format!("{e:#}"),
            }),
        }
    }

    /// Assemble a pipeline for a conversation whose stored log is `log`.
    ///
    /// The log normally ends with the question about to be answered; its
    /// length drives memory selection.
    pub async fn build(&self, log: &[ChatMessage]) -> Result<Pipeline, PipelineError> {
        let mut config = select_configuration(log.len());
        config.prompt_template.clone_from(&self.settings.prompt_template);

        self.check_dependencies().await?;

        let model = self.model();
        let summarizer = Summarizer::new(
            self.generator.clone(),
            model.clone(),
            self.settings.request_timeout,
        );
        let memory = build_memory(&config, log, &summarizer).await?;

        info!(
            "Assembled pipeline: {} memory, {} stored messages, {} pairs replayed",
            config.memory_kind,
            log.len(),
            memory.replayed_pairs()
        );

        Ok(Pipeline {
            config,
            memory,
            index: self.index.clone(),
            generator: self.generator.clone(),
            model,
            settings: self.settings.clone(),
        })
    }
}

/// One request's retrieval and generation chain.
///
/// Owns its memory exclusively; dropped when the request completes.
pub struct Pipeline {
    config: PipelineConfiguration,
    memory: ConversationMemory,
    index: Arc<dyn DocumentIndex>,
    generator: Arc<dyn LLMProvider>,
    model: String,
    settings: PipelineSettings,
}

async fn bounded<T>(
    stage: Stage,
    limit: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, PipelineError> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(stage.into_error(e)),
        Err(_) => Err(PipelineError::Timeout { stage, limit }),
    }
}

impl Pipeline {
    #[must_use]
    pub const fn config(&self) -> &PipelineConfiguration {
        &self.config
    }

    #[must_use]
    pub const fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    #[must_use]
    pub const fn memory_kind(&self) -> MemoryKind {
        self.memory.kind()
    }

    async fn standalone_question(&self, question: &str) -> Result<String, PipelineError> {
        let request = [ChatMessage::user(prompt::condense_prompt(
            &self.memory.chat_history(),
            question,
        ))];
        let response = bounded(
            Stage::Condense,
            self.settings.request_timeout,
            self.generator.chat(&request, &self.model),
        )
        .await?;

        let rewritten = response.content.trim();
        if rewritten.is_empty() {
            return Ok(question.to_string());
        }
        debug!("Rewrote follow-up question for retrieval: {rewritten}");
        Ok(rewritten.to_string())
    }

    /// Answer `question` against the document index and this memory.
    pub async fn answer(&mut self, question: &str) -> Result<AnswerResult, PipelineError> {
        let limit = self.settings.request_timeout;
        self.memory.compact().await?;

        let standalone_question = if self.settings.condense_question && !self.memory.is_empty() {
            Some(self.standalone_question(question).await?)
        } else {
            None
        };
        let search_query = standalone_question.as_deref().unwrap_or(question);

        let passages = bounded(
            Stage::Retrieval,
            limit,
            self.index.search(search_query, self.config.retrieval_k),
        )
        .await?;
        debug!("Retrieved {} passages", passages.len());

        let context = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let rendered = prompt::answer_prompt(
            &self.config.prompt_template,
            &context,
            &self.memory.chat_history(),
            question,
        );

        let response = bounded(
            Stage::Generation,
            limit,
            self.generator.chat(&[ChatMessage::user(rendered)], &self.model),
        )
        .await?;

        let answer = response.content.trim().to_string();
        if answer.is_empty() {
            return Err(PipelineError::EmptyAnswer);
        }
        if let Some(usage) = &response.usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        self.memory.save_turn(question, &answer);

        Ok(AnswerResult {
            answer,
            source_passages: self.settings.return_sources.then_some(passages),
            standalone_question,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = PipelineSettings::default();
        assert!(prompt::missing_placeholders(&settings.prompt_template).is_empty());
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
        assert!(!settings.return_sources);
        assert!(!settings.condense_question);
    }

    #[test]
    fn builder_sets_fields() {
        let settings = PipelineSettings::default()
            .with_model("gpt-4o-mini")
            .with_return_sources(true)
            .with_condense_question(true)
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(settings.model.as_deref(), Some("gpt-4o-mini"));
        assert!(settings.return_sources);
        assert!(settings.condense_question);
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
    }
}
