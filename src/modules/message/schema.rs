use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Messages are immutable; `id` is a per-database sequence and defines the
/// total order inside a conversation.
#[derive(Debug, Clone, FromRow)]
pub struct MessageEntity {
    pub id: i64,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub image_path: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
