use async_trait::async_trait;
use medrag_core::{ChatMessage, Role, Session, SessionStorage};
use medrag_entities::sessions;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Set,
};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

fn is_table_already_exists_error(err: &DbErr) -> bool {
    err.to_string().contains("table") && err.to_string().contains("already exists")
}

/// Session storage persisted in a SQL database (SQLite by default).
pub struct SessionManager {
    db: DatabaseConnection,
}

impl SessionManager {
    /// Open (or create) a SQLite database file.
    pub async fn new(db_path: &Path) -> anyhow::Result<Self> {
        Self::connect(&format!("sqlite://{}?mode=rwc", db_path.display())).await
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to session database: {database_url}");

        let db = Database::connect(database_url).await?;

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let stmt = schema.create_table_from_entity(sessions::Entity);
        match db.execute_unprepared(&backend.build(&stmt).to_string()).await {
            Ok(_) => {}
            Err(e) if is_table_already_exists_error(&e) => {
                info!("Sessions table already exists, skipping creation");
            }
            Err(e) => return Err(e.into()),
        }

        info!("SessionManager initialized");
        Ok(Self { db })
    }

    /// List all stored session IDs.
    pub async fn list_sessions(&self) -> anyhow::Result<Vec<Uuid>> {
        let models = sessions::Entity::find().all(&self.db).await?;
        Ok(models.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl SessionStorage for SessionManager {
    async fn get_or_create(&self, id: &Uuid) -> anyhow::Result<Session> {
        let Some(model) = sessions::Entity::find_by_id(*id).one(&self.db).await? else {
            return Ok(Session::empty(*id));
        };

        let messages: Vec<ChatMessage> = serde_json::from_str(&model.messages)?;
        Ok(Session {
            id: model.id,
            messages,
            created_at: model.created_at.and_utc(),
            updated_at: model.updated_at.and_utc(),
        })
    }

    async fn add_message(&self, id: &Uuid, role: Role, content: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().naive_utc();
        let message = ChatMessage {
            role,
            content: content.to_string(),
        };

        if let Some(model) = sessions::Entity::find_by_id(*id).one(&self.db).await? {
            let mut messages: Vec<ChatMessage> = serde_json::from_str(&model.messages)?;
            messages.push(message);

            sessions::Entity::update(sessions::ActiveModel {
                id: Set(model.id),
                messages: Set(serde_json::to_string(&messages)?),
                created_at: Set(model.created_at),
                updated_at: Set(now),
            })
            .exec(&self.db)
            .await?;
        } else {
            sessions::ActiveModel {
                id: Set(*id),
                messages: Set(serde_json::to_string(&[message])?),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await?;
        }

        tracing::debug!("Added {role} message to session: {id}");
        Ok(())
    }

    async fn clear_session(&self, id: &Uuid) -> anyhow::Result<()> {
        sessions::Entity::delete_by_id(*id).exec(&self.db).await?;
        info!("Cleared session: {id}");
        Ok(())
    }
}
