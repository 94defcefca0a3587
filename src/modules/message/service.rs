/// Message service
///
/// The authoritative write path for chat: persist first, then publish the
/// persisted message to the conversation room. Sends to one conversation are
/// serialised so that publish order always equals persistence order.
use actix::Addr;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::conversation::schema::ConversationEntity;
use crate::modules::file_upload::{BlobStorage, Bucket, UploadedFile};
use crate::modules::message::model::{
    InsertMessage, MAX_CONTENT_LEN, MessageHistoryQuery, MessagePage, MessageResponse,
    normalize_content,
};
use crate::modules::message::repository::MessageRepository;
use crate::modules::websocket::events::{BroadcastToRoom, Room};
use crate::modules::websocket::message::ServerMessage;
use crate::modules::websocket::server::RealtimeServer;
use crate::utils::Principal;

/// One async lock per conversation, created on demand and dropped once idle
#[derive(Clone, Default)]
pub struct ConversationLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    pub async fn acquire(&self, conversation_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            // only the map itself still references an idle lock
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(conversation_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[derive(Clone)]
pub struct MessageService<M, C>
where
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
{
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    storage: Arc<BlobStorage>,
    realtime: Addr<RealtimeServer>,
    locks: ConversationLocks,
}

impl<M, C> MessageService<M, C>
where
    M: MessageRepository + Send + Sync,
    C: ConversationRepository + Send + Sync,
{
    pub fn with_dependencies(
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        storage: Arc<BlobStorage>,
        realtime: Addr<RealtimeServer>,
    ) -> Self {
        MessageService {
            message_repo,
            conversation_repo,
            storage,
            realtime,
            locks: ConversationLocks::default(),
        }
    }

    async fn participant_conversation(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let conversation = self
            .conversation_repo
            .find_by_id(&conversation_id, self.conversation_repo.get_pool())
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !conversation.includes(&principal.id) {
            return Err(error::SystemError::forbidden("Not a participant of this conversation"));
        }
        Ok(conversation)
    }

    /// Persist a message, then publish it as `message:new` to the conversation room.
    /// Nothing is published if persisting fails.
    pub async fn send(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
        content: Option<String>,
        image: Option<UploadedFile>,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = normalize_content(content);
        if content.is_none() && image.is_none() {
            return Err(error::SystemError::bad_request("Message must have text or an image"));
        }
        if content.as_ref().is_some_and(|c| c.chars().count() > MAX_CONTENT_LEN) {
            return Err(error::SystemError::bad_request("Message is too long"));
        }

        // taken before any other await so that sends queue in arrival order
        let _guard = self.locks.acquire(conversation_id).await;

        self.participant_conversation(principal, conversation_id).await?;

        let image_path = match &image {
            Some(file) => Some(self.storage.store(Bucket::Messages, file).await?),
            None => None,
        };

        let insert = InsertMessage {
            conversation_id,
            sender_id: principal.id,
            content,
            image_path: image_path.clone(),
        };
        let entity = match self.message_repo.create(&insert, self.message_repo.get_pool()).await {
            Ok(entity) => entity,
            Err(e) => {
                if let Some(path) = image_path {
                    self.storage.remove(&path).await;
                }
                return Err(e);
            }
        };

        let message = MessageResponse::from_entity(entity, &self.storage);
        match serde_json::to_value(&message) {
            Ok(payload) => self.realtime.do_send(BroadcastToRoom {
                room: Room::Conversation(conversation_id),
                message: ServerMessage::NewMessage { conversation_id, message: payload },
                skip_session: None,
            }),
            Err(e) => tracing::warn!("Could not publish message {}: {}", message.id, e),
        }

        tracing::debug!(
            "Message {} persisted and published to conversation {}",
            message.id,
            conversation_id
        );
        Ok(message)
    }

    pub async fn history(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
        query: MessageHistoryQuery,
    ) -> Result<MessagePage, error::SystemError> {
        self.participant_conversation(principal, conversation_id).await?;

        let limit = query.limit();
        let mut rows = self
            .message_repo
            .find_page(&conversation_id, query.before, limit + 1, self.message_repo.get_pool())
            .await?;

        let has_more = rows.len() as i64 > limit;
        rows.truncate(limit as usize);
        let next_cursor = if has_more { rows.last().map(|m| m.id) } else { None };
        rows.reverse();

        let messages =
            rows.into_iter().map(|m| MessageResponse::from_entity(m, &self.storage)).collect();
        Ok(MessagePage { messages, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversation::repository_mock::{
        MockConversationRepository, conversation_between,
    };
    use crate::modules::file_upload::UploadConfig;
    use crate::modules::message::repository_mock::MockMessageRepository;
    use crate::modules::user::schema::UserRole;
    use crate::modules::websocket::testing::{Drain, flush, member_of};
    use actix::Actor;
    use std::time::Duration;

    fn buyer() -> Principal {
        Principal { id: Uuid::now_v7(), role: UserRole::Buyer }
    }

    fn service(
        messages: Arc<MockMessageRepository>,
        conversations: MockConversationRepository,
        realtime: Addr<RealtimeServer>,
    ) -> MessageService<MockMessageRepository, MockConversationRepository> {
        let storage = Arc::new(BlobStorage::new(UploadConfig::default()));
        MessageService::with_dependencies(messages, Arc::new(conversations), storage, realtime)
    }

    fn published_contents(frames: Vec<ServerMessage>) -> Vec<String> {
        frames
            .into_iter()
            .filter_map(|frame| match frame {
                ServerMessage::NewMessage { message, .. } => {
                    message["content"].as_str().map(str::to_string)
                }
                _ => None,
            })
            .collect()
    }

    #[actix::test]
    async fn back_to_back_sends_keep_their_order() {
        let sender = buyer();
        let conversation = conversation_between(sender.id, Uuid::now_v7());
        let conv = conversation.id;
        // the first send's participant lookup is the slow one
        let conversations = MockConversationRepository::new()
            .with_row(conversation)
            .with_slow_first_lookup(Duration::from_millis(50));
        let messages = Arc::new(MockMessageRepository::new());
        let server = RealtimeServer::new().start();
        let watcher = member_of(&server, Room::Conversation(conv)).await;
        let svc = service(messages.clone(), conversations, server.clone());

        let (first, second) = tokio::join!(
            svc.send(&sender, conv, Some("first".into()), None),
            svc.send(&sender, conv, Some("second".into()), None),
        );

        assert!(first.unwrap().id < second.unwrap().id);
        assert_eq!(messages.contents(), vec!["first", "second"]);

        flush(&server).await;
        let published = published_contents(watcher.send(Drain).await.unwrap());
        assert_eq!(published, vec!["first", "second"]);
    }

    #[actix::test]
    async fn failed_persist_publishes_nothing() {
        let sender = buyer();
        let conversation = conversation_between(sender.id, Uuid::now_v7());
        let conv = conversation.id;
        let server = RealtimeServer::new().start();
        let watcher = member_of(&server, Room::Conversation(conv)).await;
        let svc = service(
            Arc::new(MockMessageRepository::failing()),
            MockConversationRepository::new().with_row(conversation),
            server.clone(),
        );

        let result = svc.send(&sender, conv, Some("hello".into()), None).await;

        assert!(matches!(result, Err(error::SystemError::DatabaseError(_))));
        flush(&server).await;
        assert!(watcher.send(Drain).await.unwrap().is_empty());
    }

    #[actix::test]
    async fn outsiders_cannot_send() {
        let conversation = conversation_between(Uuid::now_v7(), Uuid::now_v7());
        let conv = conversation.id;
        let messages = Arc::new(MockMessageRepository::new());
        let svc = service(
            messages.clone(),
            MockConversationRepository::new().with_row(conversation),
            RealtimeServer::new().start(),
        );

        let result = svc.send(&buyer(), conv, Some("hi".into()), None).await;

        assert!(matches!(result, Err(error::SystemError::Forbidden(_))));
        assert!(messages.contents().is_empty());
    }

    #[actix::test]
    async fn blank_message_is_rejected_before_any_lookup() {
        let svc = service(
            Arc::new(MockMessageRepository::new()),
            MockConversationRepository::new(),
            RealtimeServer::new().start(),
        );
        let result = svc.send(&buyer(), Uuid::now_v7(), Some("   ".into()), None).await;
        assert!(matches!(result, Err(error::SystemError::BadRequest(_))));
    }

    #[actix::test]
    async fn history_pages_backwards_oldest_first() {
        let sender = buyer();
        let conversation = conversation_between(sender.id, Uuid::now_v7());
        let conv = conversation.id;
        let svc = service(
            Arc::new(MockMessageRepository::new()),
            MockConversationRepository::new().with_row(conversation),
            RealtimeServer::new().start(),
        );
        for text in ["a", "b", "c"] {
            svc.send(&sender, conv, Some(text.into()), None).await.unwrap();
        }

        let query = MessageHistoryQuery { before: None, limit: Some(2) };
        let page = svc.history(&sender, conv, query).await.unwrap();
        let texts: Vec<_> = page.messages.iter().filter_map(|m| m.content.as_deref()).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(page.next_cursor, Some(2));

        let query = MessageHistoryQuery { before: page.next_cursor, limit: Some(2) };
        let page = svc.history(&sender, conv, query).await.unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.next_cursor, None);
    }

    #[actix::test]
    async fn sends_to_one_conversation_are_serialised() {
        let locks = ConversationLocks::default();
        let conv = Uuid::now_v7();

        let guard = locks.acquire(conv).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(conv)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.acquire(conv)).await;
        assert!(reacquired.is_ok());
    }

    #[actix::test]
    async fn other_conversations_are_not_blocked() {
        let locks = ConversationLocks::default();
        let _a = locks.acquire(Uuid::now_v7()).await;
        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::now_v7()));
        assert!(other.await.is_ok());
    }

    #[actix::test]
    async fn idle_locks_are_pruned() {
        let locks = ConversationLocks::default();
        drop(locks.acquire(Uuid::now_v7()).await);
        drop(locks.acquire(Uuid::now_v7()).await);
        let _held = locks.acquire(Uuid::now_v7()).await;
        assert_eq!(locks.len().await, 1);
    }
}
