use async_trait::async_trait;
use medrag_core::{ChatMessage, Role, Session, SessionStorage};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Process-local session storage. Logs are lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStore {
    async fn get_or_create(&self, id: &Uuid) -> anyhow::Result<Session> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .cloned()
            .unwrap_or_else(|| Session::empty(*id)))
    }

    async fn add_message(&self, id: &Uuid, role: Role, content: &str) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(*id).or_insert_with(|| Session::empty(*id));
        session.messages.push(ChatMessage {
            role,
            content: content.to_string(),
        });
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn clear_session(&self, id: &Uuid) -> anyhow::Result<()> {
        self.sessions.write().await.remove(id);
        info!("Cleared session: {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_is_empty_and_not_stored() {
        let store = InMemorySessionStore::new();
        let session = store
            .get_or_create(&Uuid::now_v7())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(session.messages.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn messages_keep_insertion_order() {
        let store = InMemorySessionStore::new();
        let id = Uuid::now_v7();
        for (role, content) in [
            (Role::User, "What is diabetes?"),
            (Role::Assistant, "A chronic condition."),
            (Role::User, "Symptoms?"),
        ] {
            store
                .add_message(&id, role, content)
                .await
                .unwrap_or_else(|e| panic!("{e}"));
        }

        let session = store.get_or_create(&id).await.unwrap_or_else(|e| panic!("{e}"));
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["What is diabetes?", "A chronic condition.", "Symptoms?"]
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn clear_removes_the_log() {
        let store = InMemorySessionStore::new();
        let id = Uuid::now_v7();
        store
            .add_message(&id, Role::User, "hello")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        store.clear_session(&id).await.unwrap_or_else(|e| panic!("{e}"));

        let session = store.get_or_create(&id).await.unwrap_or_else(|e| panic!("{e}"));
        assert!(session.messages.is_empty());
    }
}
