use uuid::Uuid;

use crate::modules::conversation::model::ConversationRow;
use crate::modules::conversation::repository::{ConversationRepository, ReadCursorRepository};
use crate::{api::error, modules::conversation::schema::ConversationEntity};

#[derive(Clone)]
pub struct ConversationPgRepository {
    pool: sqlx::PgPool,
}

impl ConversationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationPgRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn find_by_id<'e, E>(
        &self,
        conversation_id: &Uuid,
        tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(tx)
                .await?;

        Ok(conversation)
    }

    async fn find_by_pair<'e, E>(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            "SELECT * FROM conversations WHERE user_low = $1 AND user_high = $2",
        )
        .bind(user_low)
        .bind(user_high)
        .fetch_optional(tx)
        .await?;

        Ok(conversation)
    }

    async fn insert_if_absent<'e, E>(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        tx: E,
    ) -> Result<Option<ConversationEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, user_low, user_high)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_low, user_high) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_low)
        .bind(user_high)
        .fetch_optional(tx)
        .await?;

        Ok(conversation)
    }

    async fn find_summaries_by_user<'e, E>(
        &self,
        user_id: &Uuid,
        tx: E,
    ) -> Result<Vec<ConversationRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT
                c.id,
                c.created_at,

                u.id AS peer_id,
                u.username AS peer_username,
                u.name AS peer_name,
                u.avatar_path AS peer_avatar_path,
                u.last_seen_at AS peer_last_seen_at,

                m.id AS last_message_id,
                m.sender_id AS last_message_sender_id,
                m.content AS last_message_content,
                m.image_path AS last_message_image_path,
                m.created_at AS last_message_at,

                COALESCE(r.last_read_message_id, 0) AS last_read_message_id,
                (
                    SELECT COUNT(*)
                    FROM messages um
                    WHERE um.conversation_id = c.id
                      AND um.sender_id <> $1
                      AND um.id > COALESCE(r.last_read_message_id, 0)
                ) AS unread_count
            FROM conversations c
            JOIN users u
                ON u.id = CASE WHEN c.user_low = $1 THEN c.user_high ELSE c.user_low END
            LEFT JOIN LATERAL (
                SELECT id, sender_id, content, image_path, created_at
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY id DESC
                LIMIT 1
            ) m ON true
            LEFT JOIN conversation_reads r
                ON r.conversation_id = c.id AND r.user_id = $1
            WHERE c.user_low = $1 OR c.user_high = $1
            ORDER BY COALESCE(m.created_at, c.created_at) DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(tx)
        .await?;

        Ok(rows)
    }
}

#[derive(Clone)]
pub struct ReadCursorPgRepository;

#[async_trait::async_trait]
impl ReadCursorRepository for ReadCursorPgRepository {
    async fn lock_cursor<'e>(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<i64, error::SystemError> {
        sqlx::query(
            r#"
            INSERT INTO conversation_reads (conversation_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (conversation_id, user_id) DO NOTHING
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        let current = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT last_read_message_id FROM conversation_reads
            WHERE conversation_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(current)
    }

    async fn set_cursor<'e, E>(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        last_read_message_id: i64,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE conversation_reads
            SET last_read_message_id = $3, updated_at = NOW()
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(last_read_message_id)
        .execute(tx)
        .await?;

        Ok(())
    }
}
