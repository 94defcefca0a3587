//! In-memory message store for service tests
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    api::error,
    configs::lazy_pool,
    modules::message::{model::InsertMessage, repository::MessageRepository, schema::MessageEntity},
};

pub struct MockMessageRepository {
    pool: sqlx::PgPool,
    rows: Mutex<Vec<MessageEntity>>,
    failing: bool,
}

impl MockMessageRepository {
    pub fn new() -> Self {
        Self { pool: lazy_pool(), rows: Mutex::new(Vec::new()), failing: false }
    }

    /// Every insert fails as if the database were down
    pub fn failing() -> Self {
        Self { failing: true, ..Self::new() }
    }

    /// Stored text, in id order
    pub fn contents(&self) -> Vec<String> {
        self.rows.lock().unwrap().iter().filter_map(|m| m.content.clone()).collect()
    }
}

#[async_trait::async_trait]
impl MessageRepository for MockMessageRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn create<'e, E>(
        &self,
        message: &InsertMessage,
        _tx: E,
    ) -> Result<MessageEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        if self.failing {
            return Err(error::SystemError::DatabaseError("connection refused".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let entity = MessageEntity {
            id: rows.len() as i64 + 1,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            image_path: message.image_path.clone(),
            created_at: chrono::Utc::now(),
        };
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn find_page<'e, E>(
        &self,
        conversation_id: &Uuid,
        before: Option<i64>,
        limit: i64,
        _tx: E,
    ) -> Result<Vec<MessageEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|m| m.conversation_id == *conversation_id)
            .filter(|m| before.is_none_or(|b| m.id < b))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn exists_in<'e, E>(
        &self,
        conversation_id: &Uuid,
        message_id: i64,
        _tx: E,
    ) -> Result<bool, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().any(|m| m.id == message_id && m.conversation_id == *conversation_id))
    }
}
