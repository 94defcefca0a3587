use actix_web::{HttpRequest, get, post, put, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        conversation::{
            model::{
                ConversationResponse, ConversationSummary, MarkReadModel, NewConversation,
                ReadCursorResponse,
            },
            repository_pg::{ConversationPgRepository, ReadCursorPgRepository},
            service::ConversationService,
        },
        message::repository_pg::MessageRepositoryPg,
    },
    utils::ValidatedJson,
};

pub type ConversationSvc =
    ConversationService<ConversationPgRepository, ReadCursorPgRepository, MessageRepositoryPg>;

#[get("")]
pub async fn get_conversations(
    conversation_svc: web::Data<ConversationSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationSummary>>, error::Error> {
    let principal = get_principal(&req)?;
    let conversations = conversation_svc.list_conversations(&principal).await?;
    Ok(success::Success::ok(Some(conversations)).message("Successfully retrieved conversations"))
}

#[post("")]
pub async fn create_conversation(
    conversation_svc: web::Data<ConversationSvc>,
    body: ValidatedJson<NewConversation>,
    req: HttpRequest,
) -> Result<success::Success<ConversationResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let conversation = conversation_svc.ensure_conversation(&principal, body.0.recipient_id).await?;
    Ok(success::Success::ok(Some(conversation)))
}

#[put("/{conversation_id}/read")]
pub async fn mark_read(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<MarkReadModel>,
    req: HttpRequest,
) -> Result<success::Success<ReadCursorResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let cursor = conversation_svc
        .mark_read(&principal, *conversation_id, body.0.last_message_id, None)
        .await?;
    Ok(success::Success::ok(Some(cursor)))
}
