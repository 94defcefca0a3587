use actix_multipart::Multipart;
use actix_web::{HttpRequest, get, http::header, post, web};
use futures_util::StreamExt;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        conversation::repository_pg::ConversationPgRepository,
        file_upload::{BlobStorage, read_multipart},
        message::{
            model::{MessageHistoryQuery, MessagePage, MessageResponse, SendMessageModel},
            repository_pg::MessageRepositoryPg,
            service::MessageService,
        },
    },
    utils::ValidatedQuery,
};

pub type MessageSvc = MessageService<MessageRepositoryPg, ConversationPgRepository>;

const MAX_JSON_BODY: usize = 64 * 1024;

pub fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// Collect a JSON body from a raw payload, for endpoints that also accept multipart
pub async fn read_json<T>(mut payload: web::Payload) -> Result<T, error::Error>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| error::Error::bad_request(e.to_string()))?;
        if body.len() + chunk.len() > MAX_JSON_BODY {
            return Err(error::Error::bad_request("Request body too large"));
        }
        body.extend_from_slice(&chunk);
    }

    let model: T =
        serde_json::from_slice(&body).map_err(|e| error::Error::bad_request(e.to_string()))?;
    model.validate().map_err(|e| error::Error::bad_request(e.to_string()))?;
    Ok(model)
}

#[get("/{conversation_id}/messages")]
pub async fn get_messages(
    message_svc: web::Data<MessageSvc>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<MessageHistoryQuery>,
    req: HttpRequest,
) -> Result<success::Success<MessagePage>, error::Error> {
    let principal = get_principal(&req)?;
    let page = message_svc.history(&principal, *conversation_id, query.0).await?;
    Ok(success::Success::ok(Some(page)))
}

/// Accepts JSON `{content}` or multipart with `content` and an optional `image`
#[post("/{conversation_id}/messages")]
pub async fn send_message(
    message_svc: web::Data<MessageSvc>,
    storage: web::Data<BlobStorage>,
    conversation_id: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let principal = get_principal(&req)?;

    let (content, image) = if is_multipart(&req) {
        let multipart = Multipart::new(req.headers(), payload);
        let mut form = read_multipart(multipart, storage.max_file_size(), 1).await?;
        (form.text("content").map(str::to_string), form.take_file("image"))
    } else {
        let body: SendMessageModel = read_json(payload).await?;
        (body.content, None)
    };

    let message = message_svc.send(&principal, *conversation_id, content, image).await?;
    Ok(success::Success::created(Some(message)).message("Message sent"))
}
