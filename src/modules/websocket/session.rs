/// Session actors
///
/// One actor per socket. A chat session is created only after the handshake
/// produced a principal; from there it tracks the conversations it joined and
/// its typing indicators, and tears both down when the socket closes. Product
/// sessions are anonymous viewers that only follow product rooms.
///
/// Outbound frames go through an mpsc channel drained by the socket pump in handler.rs.
use actix::prelude::*;
use actix_web::web;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::modules::conversation::handle::ConversationSvc;
use crate::modules::message::handle::MessageSvc;
use crate::utils::Principal;

use super::events::*;
use super::membership::{JoinStart, Membership};
use super::message::{ClientMessage, ProductClientMessage, ServerMessage};
use super::server::RealtimeServer;
use super::typing::{TYPING_TIMEOUT, TypingTracker};

/// Socket closed; stop the actor so the server forgets the connection
#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseSession;

impl Message for ClientMessage {
    type Result = ();
}

impl Message for ProductClientMessage {
    type Result = ();
}

fn push_frame(tx: &mpsc::UnboundedSender<String>, session_id: Uuid, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => tx.send(json).is_ok(),
        Err(e) => {
            tracing::error!("Could not serialize frame for session {}: {}", session_id, e);
            true
        }
    }
}

pub struct ChatSession {
    pub id: Uuid,
    principal: Principal,
    server: Addr<RealtimeServer>,
    tx: mpsc::UnboundedSender<String>,
    conversations: web::Data<ConversationSvc>,
    messages: web::Data<MessageSvc>,
    membership: Membership,
    typing: TypingTracker,
}

impl ChatSession {
    pub fn new(
        principal: Principal,
        server: Addr<RealtimeServer>,
        tx: mpsc::UnboundedSender<String>,
        conversations: web::Data<ConversationSvc>,
        messages: web::Data<MessageSvc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            principal,
            server,
            tx,
            conversations,
            messages,
            membership: Membership::default(),
            typing: TypingTracker::default(),
        }
    }

    fn send_to_client(&self, msg: &ServerMessage, ctx: &mut Context<Self>) {
        if !push_frame(&self.tx, self.id, msg) {
            tracing::debug!("Socket for session {} is gone, stopping", self.id);
            ctx.stop();
        }
    }

    fn send_error(&self, message: &str, ctx: &mut Context<Self>) {
        self.send_to_client(&ServerMessage::Error { message: message.to_string() }, ctx);
    }

    fn require_joined(&self, conversation_id: Uuid, ctx: &mut Context<Self>) -> bool {
        if self.membership.is_joined(&conversation_id) {
            return true;
        }
        self.send_error("Join the conversation first", ctx);
        false
    }

    fn broadcast_typing(&self, conversation_id: Uuid, is_typing: bool) {
        self.server.do_send(BroadcastToRoom {
            room: Room::Conversation(conversation_id),
            message: ServerMessage::Typing {
                conversation_id,
                user_id: self.principal.id,
                is_typing,
            },
            skip_session: Some(self.id),
        });
    }

    fn handle_join(&mut self, conversation_id: Uuid, ctx: &mut Context<Self>) {
        match self.membership.begin_join(conversation_id) {
            JoinStart::Joined => {
                self.send_to_client(&ServerMessage::Joined { conversation_id }, ctx);
                return;
            }
            JoinStart::InFlight => return,
            JoinStart::Check => {}
        }

        let svc = self.conversations.clone();
        let user_id = self.principal.id;

        ctx.spawn(
            async move { svc.require_participant(&user_id, conversation_id).await }
                .into_actor(self)
                .map(move |result, act, ctx| match result {
                    Ok(_) => {
                        if !act.membership.complete_join(conversation_id) {
                            tracing::debug!(
                                "Join of {} to conversation {} cancelled by leave",
                                user_id,
                                conversation_id
                            );
                            return;
                        }
                        act.server.do_send(JoinRoom {
                            session_id: act.id,
                            room: Room::Conversation(conversation_id),
                        });
                        act.send_to_client(&ServerMessage::Joined { conversation_id }, ctx);
                        tracing::debug!("User {} joined conversation {}", user_id, conversation_id);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "User {} refused from conversation {}: {}",
                            user_id,
                            conversation_id,
                            e
                        );
                        if act.membership.fail_join(conversation_id) {
                            act.send_error("Cannot join this conversation", ctx);
                        }
                    }
                }),
        );
    }

    fn handle_leave(&mut self, conversation_id: Uuid) {
        if !self.membership.leave(conversation_id) {
            return;
        }
        if self.typing.stop(conversation_id) {
            self.broadcast_typing(conversation_id, false);
        }
        self.server.do_send(LeaveRoom {
            session_id: self.id,
            room: Room::Conversation(conversation_id),
        });
    }

    fn handle_send(&mut self, conversation_id: Uuid, content: String, ctx: &mut Context<Self>) {
        if !self.require_joined(conversation_id, ctx) {
            return;
        }

        // sending implies the burst of typing is over
        if self.typing.stop(conversation_id) {
            self.broadcast_typing(conversation_id, false);
        }

        let svc = self.messages.clone();
        let principal = self.principal;
        let session_id = self.id;

        ctx.spawn(
            async move {
                // the sender sees its own message through the room echo; failures stay server-side
                if let Err(e) = svc.send(&principal, conversation_id, Some(content), None).await {
                    tracing::warn!(
                        "Message from session {} to conversation {} not persisted: {}",
                        session_id,
                        conversation_id,
                        e
                    );
                }
            }
            .into_actor(self),
        );
    }

    fn handle_typing(&mut self, conversation_id: Uuid, is_typing: bool, ctx: &mut Context<Self>) {
        if !self.require_joined(conversation_id, ctx) {
            return;
        }

        if !is_typing {
            if self.typing.stop(conversation_id) {
                self.broadcast_typing(conversation_id, false);
            }
            return;
        }

        let (started, generation) = self.typing.start(conversation_id);
        if started {
            self.broadcast_typing(conversation_id, true);
        }

        ctx.run_later(TYPING_TIMEOUT, move |act, _| {
            if act.typing.expire(conversation_id, generation) {
                act.broadcast_typing(conversation_id, false);
            }
        });
    }

    fn handle_read(
        &mut self,
        conversation_id: Uuid,
        last_message_id: i64,
        ctx: &mut Context<Self>,
    ) {
        if !self.require_joined(conversation_id, ctx) {
            return;
        }

        let svc = self.conversations.clone();
        let principal = self.principal;
        let session_id = self.id;

        ctx.spawn(
            async move {
                let result =
                    svc.mark_read(&principal, conversation_id, last_message_id, Some(session_id));
                if let Err(e) = result.await {
                    tracing::warn!(
                        "Read cursor for user {} in conversation {} not updated: {}",
                        principal.id,
                        conversation_id,
                        e
                    );
                }
            }
            .into_actor(self),
        );
    }
}

impl Actor for ChatSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("Chat session {} started for user {}", self.id, self.principal.id);

        self.server.do_send(Connect {
            id: self.id,
            user_id: Some(self.principal.id),
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        for conversation_id in self.typing.drain() {
            self.broadcast_typing(conversation_id, false);
        }
        self.membership.clear();
        self.server.do_send(Disconnect { id: self.id });

        tracing::debug!("Chat session {} stopped", self.id);
    }
}

impl Handler<ClientMessage> for ChatSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ClientMessage::Join { conversation_id } => self.handle_join(conversation_id, ctx),
            ClientMessage::Leave { conversation_id } => self.handle_leave(conversation_id),
            ClientMessage::SendMessage { conversation_id, content } => {
                self.handle_send(conversation_id, content, ctx)
            }
            ClientMessage::Typing { conversation_id, is_typing } => {
                self.handle_typing(conversation_id, is_typing, ctx)
            }
            ClientMessage::Read { conversation_id, last_message_id } => {
                self.handle_read(conversation_id, last_message_id, ctx)
            }
            ClientMessage::Ping => self.send_to_client(&ServerMessage::Pong, ctx),
        }
    }
}

impl Handler<ServerMessage> for ChatSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Context<Self>) {
        self.send_to_client(&msg, ctx);
    }
}

impl Handler<CloseSession> for ChatSession {
    type Result = ();

    fn handle(&mut self, _: CloseSession, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}

/// Anonymous viewer of product pages
pub struct ProductSession {
    pub id: Uuid,
    server: Addr<RealtimeServer>,
    tx: mpsc::UnboundedSender<String>,
}

impl ProductSession {
    pub fn new(server: Addr<RealtimeServer>, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id: Uuid::now_v7(), server, tx }
    }

    fn send_to_client(&self, msg: &ServerMessage, ctx: &mut Context<Self>) {
        if !push_frame(&self.tx, self.id, msg) {
            ctx.stop();
        }
    }
}

impl Actor for ProductSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.server.do_send(Connect {
            id: self.id,
            user_id: None,
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.server.do_send(Disconnect { id: self.id });
    }
}

impl Handler<ProductClientMessage> for ProductSession {
    type Result = ();

    fn handle(&mut self, msg: ProductClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ProductClientMessage::Join { product_id } => {
                let room = Room::Product(product_id);
                self.server.do_send(JoinRoom { session_id: self.id, room });
                self.send_to_client(&ServerMessage::ProductJoined { product_id }, ctx);
            }
            ProductClientMessage::Leave { product_id } => {
                self.server
                    .do_send(LeaveRoom { session_id: self.id, room: Room::Product(product_id) });
            }
            ProductClientMessage::Ping => self.send_to_client(&ServerMessage::Pong, ctx),
        }
    }
}

impl Handler<ServerMessage> for ProductSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Context<Self>) {
        self.send_to_client(&msg, ctx);
    }
}

impl Handler<CloseSession> for ProductSession {
    type Result = ();

    fn handle(&mut self, _: CloseSession, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}
