use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::file_upload::BlobStorage;
use crate::modules::message::schema::MessageEntity;

pub const MAX_CONTENT_LEN: usize = 4000;

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageModel {
    #[validate(length(max = 4000, message = "Message is too long"))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MessageHistoryQuery {
    #[validate(range(min = 1, message = "Cursor must be positive"))]
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

impl MessageHistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(30).clamp(1, 100)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MessageResponse {
    pub fn from_entity(entity: MessageEntity, storage: &BlobStorage) -> Self {
        MessageResponse {
            id: entity.id,
            conversation_id: entity.conversation_id,
            sender_id: entity.sender_id,
            content: entity.content,
            image_url: entity.image_path.as_deref().map(|p| storage.public_url(p)),
            created_at: entity.created_at,
        }
    }
}

/// Oldest-first page; `next_cursor` is passed back as `before` to load older messages
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    pub next_cursor: Option<i64>,
}

/// Trimmed text, or `None` when nothing but whitespace was sent
pub fn normalize_content(content: Option<String>) -> Option<String> {
    content.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_counts_as_absent() {
        assert_eq!(normalize_content(Some("   ".into())), None);
        assert_eq!(normalize_content(None), None);
        assert_eq!(normalize_content(Some(" hello ".into())), Some("hello".into()));
    }

    #[test]
    fn history_limit_is_bounded() {
        let q = MessageHistoryQuery { before: None, limit: Some(1000) };
        assert_eq!(q.limit(), 100);
        let q = MessageHistoryQuery { before: None, limit: Some(0) };
        assert_eq!(q.limit(), 1);
        let q = MessageHistoryQuery { before: None, limit: None };
        assert_eq!(q.limit(), 30);
    }
}
