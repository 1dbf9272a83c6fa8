//! Adaptive conversation memory.
//!
//! Short conversations are kept as a sliding window of recent turns; once
//! a conversation grows past [`SUMMARY_THRESHOLD`] messages the older part
//! is compressed into a running summary. Memory is rebuilt from the stored
//! message log on every request.

mod summary;
mod window;

use medrag_core::{ChatMessage, Role};
use tracing::{debug, warn};

use crate::error::MemoryError;
use crate::prompt::{self, CONVERSATIONAL_PROMPT_TEMPLATE};

pub use summary::{SummaryMemory, Summarizer, estimate_tokens};
pub use window::WindowMemory;

/// Message count above which the summary representation is used.
pub const SUMMARY_THRESHOLD: usize = 10;
pub const SUMMARY_TOKEN_BUDGET: usize = 1500;
pub const SUMMARY_WINDOW_SIZE: usize = 6;
pub const WINDOW_TOKEN_BUDGET: usize = 1000;
/// Largest window used for short conversations.
pub const MAX_WINDOW_SIZE: usize = 4;
/// Window used when there is no history yet.
pub const EMPTY_WINDOW_SIZE: usize = 3;
pub const RETRIEVAL_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Window,
    Summary,
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Window => write!(f, "window"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

/// Parameters for one pipeline instance.
///
/// `window_size` is carried for the summary kind as well but only the
/// window kind reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfiguration {
    pub memory_kind: MemoryKind,
    pub token_budget: usize,
    pub window_size: usize,
    pub retrieval_k: usize,
    pub prompt_template: String,
}

/// Choose the memory representation from the number of stored messages.
#[must_use]
pub fn select_configuration(turn_count: usize) -> PipelineConfiguration {
    let (memory_kind, token_budget, window_size) = if turn_count > SUMMARY_THRESHOLD {
        (MemoryKind::Summary, SUMMARY_TOKEN_BUDGET, SUMMARY_WINDOW_SIZE)
    } else if turn_count > 0 {
        (
            MemoryKind::Window,
            WINDOW_TOKEN_BUDGET,
            turn_count.min(MAX_WINDOW_SIZE),
        )
    } else {
        (MemoryKind::Window, WINDOW_TOKEN_BUDGET, EMPTY_WINDOW_SIZE)
    };

    PipelineConfiguration {
        memory_kind,
        token_budget,
        window_size,
        retrieval_k: RETRIEVAL_K,
        prompt_template: CONVERSATIONAL_PROMPT_TEMPLATE.to_string(),
    }
}

#[derive(Clone)]
enum Store {
    Window(WindowMemory),
    Summary(SummaryMemory),
}

/// Conversation memory owned by exactly one pipeline.
#[derive(Clone)]
pub struct ConversationMemory {
    store: Store,
    replayed_pairs: usize,
    skipped_pairs: usize,
}

impl ConversationMemory {
    #[must_use]
    pub fn empty(config: &PipelineConfiguration, summarizer: &Summarizer) -> Self {
        let store = match config.memory_kind {
            MemoryKind::Window => Store::Window(WindowMemory::new(config.window_size)),
            MemoryKind::Summary => Store::Summary(SummaryMemory::new(
                config.token_budget,
                summarizer.clone(),
            )),
        };
        Self {
            store,
            replayed_pairs: 0,
            skipped_pairs: 0,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        match self.store {
            Store::Window(_) => MemoryKind::Window,
            Store::Summary(_) => MemoryKind::Summary,
        }
    }

    /// Number of user/assistant pairs replayed from the stored log.
    #[must_use]
    pub const fn replayed_pairs(&self) -> usize {
        self.replayed_pairs
    }

    /// Number of stored pairs that were not a user message followed by an
    /// assistant message.
    #[must_use]
    pub const fn skipped_pairs(&self) -> usize {
        self.skipped_pairs
    }

    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        match &self.store {
            Store::Window(window) => window.messages(),
            Store::Summary(summary) => summary.messages(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.store {
            Store::Window(window) => window.is_empty(),
            Store::Summary(summary) => summary.is_empty(),
        }
    }

    /// History text substituted for `{chat_history}`.
    #[must_use]
    pub fn chat_history(&self) -> String {
        prompt::format_history(&self.messages())
    }

    fn push_pair(&mut self, question: &str, answer: &str) {
        let user = ChatMessage::user(question);
        let assistant = ChatMessage::assistant(answer);
        match &mut self.store {
            Store::Window(window) => {
                window.push(user);
                window.push(assistant);
            }
            Store::Summary(summary) => {
                summary.push(user);
                summary.push(assistant);
            }
        }
    }

    /// Fold history that no longer fits the token budget into the summary.
    ///
    /// A no-op for window memory and for summary memory within budget.
    pub async fn compact(&mut self) -> Result<(), MemoryError> {
        match &mut self.store {
            Store::Window(_) => Ok(()),
            Store::Summary(summary) => summary.prune().await,
        }
    }

    /// Record a completed turn.
    ///
    /// Summary memory is not compressed here; [`Self::compact`] runs the
    /// next time the memory is read for an answer.
    pub fn save_turn(&mut self, question: &str, answer: &str) {
        self.push_pair(question, answer);
    }

    /// Replay a stored message log.
    ///
    /// The log is read as consecutive pairs `(0,1), (2,3), ...`; a pair is
    /// kept only when it is a user message followed by an assistant message.
    /// A trailing unpaired message is ignored, as is a log of one message.
    fn replay(&mut self, log: &[ChatMessage]) {
        for pair in log.chunks_exact(2) {
            match pair {
                [user, assistant]
                    if user.role == Role::User && assistant.role == Role::Assistant =>
                {
                    self.push_pair(&user.content, &assistant.content);
                    self.replayed_pairs += 1;
                }
                [first, second] => {
                    debug!(
                        "Skipping stored pair ({}, {}) during replay",
                        first.role, second.role
                    );
                    self.skipped_pairs += 1;
                }
                _ => {}
            }
        }
    }
}

/// Build a fresh memory for `config` and replay `log` into it.
///
/// Summary memory compresses whatever exceeds its budget once the whole log
/// has been replayed, so a failed summarizer call fails construction.
pub async fn build_memory(
    config: &PipelineConfiguration,
    log: &[ChatMessage],
    summarizer: &Summarizer,
) -> Result<ConversationMemory, MemoryError> {
    let mut memory = ConversationMemory::empty(config, summarizer);
    memory.replay(log);
    memory.compact().await?;

    if memory.skipped_pairs > 0 {
        warn!(
            "Replay skipped {} malformed message pairs out of {}",
            memory.skipped_pairs,
            log.len() / 2
        );
    }
    debug!(
        "Built {} memory from {} messages ({} pairs replayed)",
        memory.kind(),
        log.len(),
        memory.replayed_pairs
    );
    Ok(memory)
}
