use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::conversation::schema::advance_cursor;
use crate::modules::file_upload::BlobStorage;

#[derive(Debug, Deserialize, Validate)]
pub struct NewConversation {
    pub recipient_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkReadModel {
    #[validate(range(min = 1, message = "Message id must be positive"))]
    pub last_message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub peer_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReadCursorResponse {
    pub conversation_id: Uuid,
    pub last_read_message_id: i64,
    /// `false` when the request was behind the stored cursor and ignored
    pub advanced: bool,
}

impl ReadCursorResponse {
    /// Outcome of asking to move a cursor sitting at `current` up to `requested`
    pub fn resolve(conversation_id: Uuid, current: i64, requested: i64) -> Self {
        let (last_read_message_id, advanced) = match advance_cursor(current, requested) {
            Some(next) => (next, true),
            None => (current, false),
        };
        ReadCursorResponse { conversation_id, last_read_message_id, advanced }
    }
}

#[derive(Debug, FromRow)]
pub struct ConversationRow {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,

    pub peer_id: Uuid,
    pub peer_username: String,
    pub peer_name: Option<String>,
    pub peer_avatar_path: Option<String>,
    pub peer_last_seen_at: Option<chrono::DateTime<chrono::Utc>>,

    pub last_message_id: Option<i64>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message_content: Option<String>,
    pub last_message_image_path: Option<String>,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,

    pub last_read_message_id: i64,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct PeerInfo {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LastMessageInfo {
    pub id: i64,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub peer: PeerInfo,
    pub last_message: Option<LastMessageInfo>,
    pub last_read_message_id: i64,
    pub unread_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationSummary {
    pub fn from_row(row: ConversationRow, storage: &BlobStorage) -> Self {
        let last = (row.last_message_id, row.last_message_sender_id, row.last_message_at);
        let last_message = match last {
            (Some(id), Some(sender_id), Some(created_at)) => Some(LastMessageInfo {
                id,
                sender_id,
                content: row.last_message_content,
                image_url: row.last_message_image_path.as_deref().map(|p| storage.public_url(p)),
                created_at,
            }),
            _ => None,
        };

        ConversationSummary {
            id: row.id,
            peer: PeerInfo {
                id: row.peer_id,
                username: row.peer_username,
                name: row.peer_name,
                avatar_url: row.peer_avatar_path.as_deref().map(|p| storage.public_url(p)),
                last_seen_at: row.peer_last_seen_at,
            },
            last_message,
            last_read_message_id: row.last_read_message_id,
            unread_count: row.unread_count,
            created_at: row.created_at,
        }
    }
}
