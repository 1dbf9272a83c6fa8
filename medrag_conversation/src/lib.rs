#![warn(
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

//! Retrieval-augmented conversation over the medical document index.
//!
//! Every question is answered by a freshly assembled [`Pipeline`]:
//! - the conversation length picks a memory representation
//!   (sliding window or rolling summary)
//! - the stored message log is replayed into that memory
//! - passages are retrieved, the prompt is rendered, the model answers
//!
//! Nothing but the raw message log survives between requests.

mod error;
mod manager;
pub mod memory;
mod pipeline;
pub mod prompt;

pub use error::{
    API_CONNECTION_MESSAGE, Component, ConversationError, DATABASE_MESSAGE, MISSING_KEY_MESSAGE,
    MemoryError, PipelineError, Stage,
};
pub use manager::{SessionOrchestrator, TurnOutcome, export_transcript};
pub use memory::{
    ConversationMemory, MemoryKind, PipelineConfiguration, Summarizer, build_memory,
    select_configuration,
};
pub use pipeline::{AnswerResult, Pipeline, PipelineAssembler, PipelineSettings};
