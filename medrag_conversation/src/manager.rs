//! Session orchestrator.
//!
//! Loads a session's message log, asks a freshly assembled pipeline and
//! writes the turn back. Requests for the same session are serialized so
//! the stored log always alternates question and answer.

use medrag_core::{ChatMessage, Passage, Role, SessionStorage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ConversationError;
use crate::memory::MemoryKind;
use crate::pipeline::PipelineAssembler;

/// Outcome of one answered question.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub sources: Option<Vec<Passage>>,
    pub memory_kind: MemoryKind,
    /// 1-based turn number within the session
    pub turn_number: usize,
}

pub struct SessionOrchestrator {
    assembler: PipelineAssembler,
    storage: Arc<dyn SessionStorage>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionOrchestrator {
    #[must_use]
    pub fn new(assembler: PipelineAssembler, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            assembler,
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn assembler(&self) -> &PipelineAssembler {
        &self.assembler
    }

    async fn session_lock(&self, session_id: &Uuid) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(*session_id)
            .or_default()
            .clone()
    }

    /// Drop the session's lock entry once no other request holds it.
    ///
    /// Handles are only cloned under the map lock, so a count of two
    /// (the map and `lock`) means nobody is waiting.
    async fn release_lock(&self, session_id: &Uuid, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(lock) == 2 {
            locks.remove(session_id);
        }
    }

    /// Number of sessions with a request in flight.
    pub async fn active_sessions(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Answer `question` within the session and record the turn.
    ///
    /// The question is stored before the pipeline runs, so it remains in
    /// the log when answering fails. The pipeline sees the log including
    /// the new question, which replay leaves out as an unpaired message.
    pub async fn ask(
        &self,
        session_id: &Uuid,
        question: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ConversationError::EmptyQuestion);
        }
        self.assembler
            .generator_ready()
            .map_err(|e| ConversationError::MissingCredential(e.to_string()))?;

        let lock = self.session_lock(session_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.answer_turn(session_id, question).await
        };
        self.release_lock(session_id, &lock).await;
        outcome
    }

    async fn answer_turn(
        &self,
        session_id: &Uuid,
        question: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        let mut log = self
            .storage
            .get_or_create(session_id)
            .await
            .map_err(ConversationError::Storage)?
            .messages;
        let turn_number = log.len() / 2 + 1;
        info!("Processing turn {turn_number} for session: {session_id}");

        self.storage
            .add_message(session_id, Role::User, question)
            .await
            .map_err(ConversationError::Storage)?;
        log.push(ChatMessage::user(question));

        let mut pipeline = self.assembler.build(&log).await?;
        let memory_kind = pipeline.memory_kind();
        let result = pipeline.answer(question).await?;

        self.storage
            .add_message(session_id, Role::Assistant, &result.answer)
            .await
            .map_err(ConversationError::Storage)?;

        debug!("Turn {turn_number} completed for session: {session_id}");
        Ok(TurnOutcome {
            answer: result.answer,
            sources: result.source_passages,
            memory_kind,
            turn_number,
        })
    }

    pub async fn history(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, ConversationError> {
        self.storage
            .get_or_create(session_id)
            .await
            .map(|session| session.messages)
            .map_err(ConversationError::Storage)
    }

    /// Discard the session's log; the next question starts from scratch.
    pub async fn clear(&self, session_id: &Uuid) -> Result<(), ConversationError> {
        let lock = self.session_lock(session_id).await;
        let cleared = {
            let _guard = lock.lock().await;
            self.storage
                .clear_session(session_id)
                .await
                .map_err(ConversationError::Storage)
        };
        self.release_lock(session_id, &lock).await;
        cleared
    }

    /// Plain-text transcript, or `None` when there is nothing to export.
    pub async fn export(&self, session_id: &Uuid) -> Result<Option<String>, ConversationError> {
        let messages = self.history(session_id).await?;
        Ok(export_transcript(&messages))
    }
}

/// Format a message log as a downloadable transcript.
#[must_use]
pub fn export_transcript(messages: &[ChatMessage]) -> Option<String> {
    if messages.is_empty() {
        return None;
    }

    let mut text = String::from("Medical AI Assistant Conversation\n");
    text.push_str(&"=".repeat(50));
    text.push_str("\n\n");
    for message in messages {
        let speaker = match message.role {
            Role::User => "You",
            Role::Assistant => "AI Assistant",
            Role::System => continue,
        };
        text.push_str(speaker);
        text.push_str(": ");
        text.push_str(&message.content);
        text.push_str("\n\n");
    }
    Some(text)
}
