use std::time::Duration;
use thiserror::Error;

/// External call that a pipeline waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieval,
    Generation,
    Condense,
    Summary,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retrieval => write!(f, "document retrieval"),
            Self::Generation => write!(f, "answer generation"),
            Self::Condense => write!(f, "question rewriting"),
            Self::Summary => write!(f, "history summarization"),
        }
    }
}

/// Dependency checked while a pipeline is being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    DocumentIndex,
    Generator,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentIndex => write!(f, "document index"),
            Self::Generator => write!(f, "generation gateway"),
        }
    }
}

/// Errors raised while building or updating conversation memory.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Failed to summarize conversation history: {0}")]
    Compression(#[source] anyhow::Error),

    #[error("History summarization timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Errors raised by pipeline assembly and by a single answer call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {0}")]
    Configuration(String),

    #[error("Memory construction failed: {0}")]
    MemoryConstruction(#[source] MemoryError),

    #[error("Pipeline assembly failed, {component} unavailable: {reason}")]
    Assembly {
        component: Component,
        reason: String,
    },

    #[error("Document retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),

    #[error("Answer generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("Answer generation returned an empty response")]
    EmptyAnswer,

    #[error("{stage} timed out after {}s", limit.as_secs())]
    Timeout { stage: Stage, limit: Duration },
}

impl Stage {
    pub(crate) fn into_error(self, source: anyhow::Error) -> PipelineError {
        match self {
            Self::Retrieval => PipelineError::Retrieval(source),
            Self::Generation | Self::Condense => PipelineError::Generation(source),
            Self::Summary => PipelineError::MemoryConstruction(MemoryError::Compression(source)),
        }
    }
}

impl From<MemoryError> for PipelineError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Timeout(limit) => Self::Timeout {
                stage: Stage::Summary,
                limit,
            },
            MemoryError::Compression(_) => Self::MemoryConstruction(err),
        }
    }
}

/// Errors surfaced by the session orchestrator.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Generation gateway is not configured: {0}")]
    MissingCredential(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Session storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

pub const MISSING_KEY_MESSAGE: &str =
    "OpenAI API key not configured. Please check your config file.";
pub const DATABASE_MESSAGE: &str = "Database error. Please contact administrator.";
pub const API_CONNECTION_MESSAGE: &str =
    "API connection error. Please check your OpenAI API key and try again.";

impl ConversationError {
    /// Short message that is safe to show to the person asking.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyQuestion => "Please enter a question.",
            Self::MissingCredential(_) => MISSING_KEY_MESSAGE,
            Self::Storage(_) => "Could not save the conversation. Please try again.",
            Self::Pipeline(err) => match err {
                PipelineError::Assembly {
                    component: Component::DocumentIndex,
                    ..
                } => DATABASE_MESSAGE,
                PipelineError::Assembly {
                    component: Component::Generator,
                    ..
                }
                | PipelineError::Generation(_)
                | PipelineError::EmptyAnswer => API_CONNECTION_MESSAGE,
                PipelineError::Retrieval(_) => "Document search failed. Please try again.",
                PipelineError::MemoryConstruction(_) => {
                    "Could not load the conversation history. Please try again."
                }
                PipelineError::Timeout { .. } => {
                    "The assistant took too long to respond. Please try again."
                }
                PipelineError::Configuration(_) => {
                    "The assistant is misconfigured. Please contact administrator."
                }
            },
        }
    }
}
