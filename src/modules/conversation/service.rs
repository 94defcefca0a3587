use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            model::{ConversationResponse, ConversationSummary, ReadCursorResponse},
            repository::{ConversationRepository, ReadCursorRepository},
            schema::{ConversationEntity, normalize_pair},
        },
        file_upload::BlobStorage,
        message::repository::MessageRepository,
        websocket::{
            events::{BroadcastToRoom, Room},
            message::ServerMessage,
            server::RealtimeServer,
        },
    },
    utils::Principal,
};

#[derive(Clone)]
pub struct ConversationService<R, C, M>
where
    R: ConversationRepository + Send + Sync + 'static,
    C: ReadCursorRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    conversation_repo: Arc<R>,
    cursor_repo: Arc<C>,
    message_repo: Arc<M>,
    storage: Arc<BlobStorage>,
    realtime: Addr<RealtimeServer>,
}

impl<R, C, M> ConversationService<R, C, M>
where
    R: ConversationRepository + Send + Sync + 'static,
    C: ReadCursorRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        conversation_repo: Arc<R>,
        cursor_repo: Arc<C>,
        message_repo: Arc<M>,
        storage: Arc<BlobStorage>,
        realtime: Addr<RealtimeServer>,
    ) -> Self {
        ConversationService { conversation_repo, cursor_repo, message_repo, storage, realtime }
    }

    /// Find-or-create the conversation between the caller and `recipient_id`.
    /// Concurrent callers for the same pair all end up with the same row.
    pub async fn ensure_conversation(
        &self,
        principal: &Principal,
        recipient_id: Uuid,
    ) -> Result<ConversationResponse, error::SystemError> {
        let (low, high) = normalize_pair(principal.id, recipient_id)?;
        let pool = self.conversation_repo.get_pool();

        let conversation = match self.conversation_repo.find_by_pair(&low, &high, pool).await? {
            Some(existing) => existing,
            None => match self.conversation_repo.insert_if_absent(&low, &high, pool).await {
                Ok(Some(created)) => {
                    tracing::info!("Conversation {} created", created.id);
                    created
                }
                // lost the race: the other participant's insert won
                Ok(None) => self
                    .conversation_repo
                    .find_by_pair(&low, &high, pool)
                    .await?
                    .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?,
                Err(error::SystemError::NotFound(_)) => {
                    return Err(error::SystemError::not_found("Recipient not found"));
                }
                Err(e) => return Err(e),
            },
        };

        Ok(ConversationResponse {
            id: conversation.id,
            peer_id: conversation.peer_of(&principal.id).unwrap_or(recipient_id),
            created_at: conversation.created_at,
        })
    }

    pub async fn list_conversations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ConversationSummary>, error::SystemError> {
        let rows = self
            .conversation_repo
            .find_summaries_by_user(&principal.id, self.conversation_repo.get_pool())
            .await?;

        Ok(rows.into_iter().map(|row| ConversationSummary::from_row(row, &self.storage)).collect())
    }

    /// Capability check used before any room access
    pub async fn require_participant(
        &self,
        user_id: &Uuid,
        conversation_id: Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let conversation = self
            .conversation_repo
            .find_by_id(&conversation_id, self.conversation_repo.get_pool())
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !conversation.includes(user_id) {
            return Err(error::SystemError::forbidden("Not a participant of this conversation"));
        }
        Ok(conversation)
    }

    /// Move the caller's read cursor forward and tell the room. A cursor behind
    /// the stored one is ignored and nothing is broadcast.
    pub async fn mark_read(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
        last_message_id: i64,
        origin_session: Option<Uuid>,
    ) -> Result<ReadCursorResponse, error::SystemError> {
        self.require_participant(&principal.id, conversation_id).await?;

        let mut tx = self.conversation_repo.get_pool().begin().await?;

        if !self.message_repo.exists_in(&conversation_id, last_message_id, tx.as_mut()).await? {
            return Err(error::SystemError::not_found("Message not found in this conversation"));
        }

        let current = self.cursor_repo.lock_cursor(&conversation_id, &principal.id, &mut tx).await?;
        let read = ReadCursorResponse::resolve(conversation_id, current, last_message_id);

        if read.advanced {
            self.cursor_repo
                .set_cursor(&conversation_id, &principal.id, read.last_read_message_id, tx.as_mut())
                .await?;
        }
        tx.commit().await?;

        self.announce_read(principal, &read, origin_session);
        Ok(read)
    }

    /// Tell the room about a cursor that moved; one that stayed put is not announced
    fn announce_read(
        &self,
        principal: &Principal,
        read: &ReadCursorResponse,
        origin_session: Option<Uuid>,
    ) {
        if !read.advanced {
            return;
        }
        self.realtime.do_send(BroadcastToRoom {
            room: Room::Conversation(read.conversation_id),
            message: ServerMessage::Read {
                conversation_id: read.conversation_id,
                user_id: principal.id,
                last_message_id: read.last_read_message_id,
            },
            skip_session: origin_session,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversation::repository_mock::{
        MockConversationRepository, MockReadCursorRepository, conversation_between,
    };
    use crate::modules::file_upload::UploadConfig;
    use crate::modules::message::repository_mock::MockMessageRepository;
    use crate::modules::user::schema::UserRole;
    use crate::modules::websocket::testing::{Drain, flush, member_of};
    use actix::Actor;

    type TestService = ConversationService<
        MockConversationRepository,
        MockReadCursorRepository,
        MockMessageRepository,
    >;

    fn service(
        conversations: Arc<MockConversationRepository>,
        realtime: Addr<RealtimeServer>,
    ) -> TestService {
        ConversationService::with_dependencies(
            conversations,
            Arc::new(MockReadCursorRepository::default()),
            Arc::new(MockMessageRepository::new()),
            Arc::new(BlobStorage::new(UploadConfig::default())),
            realtime,
        )
    }

    fn user() -> Principal {
        Principal { id: Uuid::now_v7(), role: UserRole::Buyer }
    }

    #[actix::test]
    async fn lost_insert_race_returns_the_winning_row() {
        let (caller, peer) = (user(), Uuid::now_v7());
        let existing = conversation_between(caller.id, peer);
        let existing_id = existing.id;
        // first lookup misses the row the peer inserted a moment later
        let repo = Arc::new(
            MockConversationRepository::new().with_row(existing).with_stale_pair_reads(1),
        );
        let svc = service(repo.clone(), RealtimeServer::new().start());

        let conversation = svc.ensure_conversation(&caller, peer).await.unwrap();

        assert_eq!(conversation.id, existing_id);
        assert_eq!(conversation.peer_id, peer);
        assert_eq!(repo.insert_attempts(), 1);
        assert_eq!(repo.row_count(), 1);
    }

    #[actix::test]
    async fn both_directions_share_one_conversation() {
        let (alice, bob) = (user(), user());
        let repo = Arc::new(MockConversationRepository::new());
        let svc = service(repo.clone(), RealtimeServer::new().start());

        let from_alice = svc.ensure_conversation(&alice, bob.id).await.unwrap();
        let from_bob = svc.ensure_conversation(&bob, alice.id).await.unwrap();

        assert_eq!(from_alice.id, from_bob.id);
        assert_eq!(from_alice.peer_id, bob.id);
        assert_eq!(from_bob.peer_id, alice.id);
        assert_eq!(repo.row_count(), 1);
    }

    #[actix::test]
    async fn unknown_recipient_is_not_found() {
        let ghost = Uuid::now_v7();
        let repo = Arc::new(MockConversationRepository::new().with_unknown_user(ghost));
        let svc = service(repo, RealtimeServer::new().start());

        let result = svc.ensure_conversation(&user(), ghost).await;
        match &result {
            Err(error::SystemError::NotFound(msg)) => assert_eq!(&**msg, "Recipient not found"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[actix::test]
    async fn conversation_with_yourself_is_rejected() {
        let repo = Arc::new(MockConversationRepository::new());
        let svc = service(repo, RealtimeServer::new().start());
        let me = user();
        let result = svc.ensure_conversation(&me, me.id).await;
        assert!(matches!(result, Err(error::SystemError::BadRequest(_))));
    }

    #[actix::test]
    async fn outsiders_fail_the_participant_check() {
        let conversation = conversation_between(Uuid::now_v7(), Uuid::now_v7());
        let conv = conversation.id;
        let repo = Arc::new(MockConversationRepository::new().with_row(conversation));
        let svc = service(repo, RealtimeServer::new().start());

        let outsider = svc.require_participant(&Uuid::now_v7(), conv).await;
        assert!(matches!(outsider, Err(error::SystemError::Forbidden(_))));
        let missing = svc.require_participant(&Uuid::now_v7(), Uuid::now_v7()).await;
        assert!(matches!(missing, Err(error::SystemError::NotFound(_))));
    }

    #[actix::test]
    async fn cursor_behind_the_stored_one_is_not_announced() {
        let reader = user();
        let conv = Uuid::now_v7();
        let server = RealtimeServer::new().start();
        let watcher = member_of(&server, Room::Conversation(conv)).await;
        let svc = service(Arc::new(MockConversationRepository::new()), server.clone());

        let behind = ReadCursorResponse::resolve(conv, 8, 5);
        assert!(!behind.advanced);
        assert_eq!(behind.last_read_message_id, 8);
        svc.announce_read(&reader, &behind, None);

        let ahead = ReadCursorResponse::resolve(conv, 8, 12);
        svc.announce_read(&reader, &ahead, None);

        flush(&server).await;
        let frames = watcher.send(Drain).await.unwrap();
        assert_eq!(frames.len(), 1);
        assert!(matches!(
            frames[0],
            ServerMessage::Read { last_message_id: 12, user_id, .. } if user_id == reader.id
        ));
    }
}

