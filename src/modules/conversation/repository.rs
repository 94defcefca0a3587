use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{model::ConversationRow, schema::ConversationEntity},
};

#[async_trait::async_trait]
pub trait ConversationRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres>;

    async fn find_by_id<'e, E>(
        &self,
        conversation_id: &Uuid,
        tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_by_pair<'e, E>(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// Conditional insert on the normalised pair; `None` if the pair already has a row
    async fn insert_if_absent<'e, E>(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_summaries_by_user<'e, E>(
        &self,
        user_id: &Uuid,
        tx: E,
    ) -> Result<Vec<ConversationRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;
}

#[async_trait::async_trait]
pub trait ReadCursorRepository {
    /// Current cursor, creating it at 0 and locking it for the rest of the transaction
    async fn lock_cursor<'e>(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<i64, error::SystemError>;

    async fn set_cursor<'e, E>(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        last_read_message_id: i64,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;
}
