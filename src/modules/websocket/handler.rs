/// WebSocket HTTP handlers
///
/// Upgrade the request, start a session actor and pump frames both ways:
/// - Inbound:  Client → WebSocket → parse frame → session actor
/// - Outbound: Realtime server → session actor → mpsc channel → WebSocket → Client
use actix::{Actor, Addr};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_ws::Message;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::message::{ClientMessage, ProductClientMessage, ServerMessage};
use super::server::RealtimeServer;
use super::session::{ChatSession, CloseSession, ProductSession};
use crate::middlewares::handshake_principal;
use crate::modules::conversation::handle::ConversationSvc;
use crate::modules::message::handle::MessageSvc;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

fn parse_frame<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    serde_json::from_str::<T>(text).map_err(|e| {
        let raw: String = text.chars().take(100).collect();
        tracing::warn!("Malformed frame: {} - raw: {}", e, raw);
        "Malformed frame".to_string()
    })
}

/// Drive one socket until either side goes away. `on_text` hands parsed frames to the
/// session actor; when it rejects a frame the reason is sent back as an error frame.
async fn pump<F>(
    mut ws: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut rx: mpsc::UnboundedReceiver<String>,
    mut on_text: F,
) where
    F: FnMut(&str) -> Result<(), String>,
{
    let mut last_heartbeat = Instant::now();
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            msg = msg_stream.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_heartbeat = Instant::now();
                        if let Err(reason) = on_text(&*text) {
                            let frame = ServerMessage::Error { message: reason };
                            let Ok(json) = serde_json::to_string(&frame) else { continue };
                            if ws.text(json).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        last_heartbeat = Instant::now();
                        if ws.pong(&data).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_heartbeat = Instant::now();
                    }
                    Some(Ok(Message::Close(reason))) => {
                        tracing::debug!("WebSocket close frame: {:?}", reason);
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!("Binary frames are not supported");
                    }
                    Some(Ok(Message::Continuation(_) | Message::Nop)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket protocol error: {}", e);
                        break;
                    }
                    None => break,
                }
            }

            Some(json) = rx.recv() => {
                if ws.text(json).await.is_err() {
                    tracing::debug!("Could not write to websocket client");
                    break;
                }
            }

            _ = interval.tick() => {
                if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
                    tracing::info!("WebSocket client silent for {:?}, dropping", CLIENT_TIMEOUT);
                    break;
                }
                if ws.ping(b"").await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws.close(None).await;
}

/// `GET /ws/chat`, identity is required before the upgrade
pub async fn chat_socket(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<RealtimeServer>>,
    conversations: web::Data<ConversationSvc>,
    messages: web::Data<MessageSvc>,
) -> Result<HttpResponse, Error> {
    let principal = handshake_principal(&req)?;

    let (response, ws, msg_stream) = actix_ws::handle(&req, stream)?;
    let (tx, rx) = mpsc::unbounded_channel::<String>();

    let addr =
        ChatSession::new(principal, server.get_ref().clone(), tx, conversations, messages).start();

    actix_web::rt::spawn(async move {
        pump(ws, msg_stream, rx, |text| {
            addr.do_send(parse_frame::<ClientMessage>(text)?);
            Ok(())
        })
        .await;
        addr.do_send(CloseSession);
    });

    tracing::info!("Chat socket opened for user {}", principal.id);
    Ok(response)
}

/// `GET /ws/products`, open to anonymous viewers
pub async fn product_socket(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<RealtimeServer>>,
) -> Result<HttpResponse, Error> {
    let (response, ws, msg_stream) = actix_ws::handle(&req, stream)?;
    let (tx, rx) = mpsc::unbounded_channel::<String>();

    let addr = ProductSession::new(server.get_ref().clone(), tx).start();

    actix_web::rt::spawn(async move {
        pump(ws, msg_stream, rx, |text| {
            addr.do_send(parse_frame::<ProductClientMessage>(text)?);
            Ok(())
        })
        .await;
        addr.do_send(CloseSession);
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_frames_are_rejected_with_a_reason() {
        assert_eq!(
            parse_frame::<ClientMessage>("{\"type\":\"join\"}").unwrap_err(),
            "Malformed frame"
        );
        assert!(parse_frame::<ClientMessage>("not json").is_err());
        assert!(matches!(
            parse_frame::<ProductClientMessage>("{\"type\":\"ping\"}"),
            Ok(ProductClientMessage::Ping)
        ));
    }
}
