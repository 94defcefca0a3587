/// Messages exchanged between connection actors, services and the realtime server
use actix::prelude::*;
use uuid::Uuid;

use super::message::ServerMessage;

/// Fan-out group. Conversation rooms carry chat traffic, product rooms carry rating updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Conversation(Uuid),
    Product(Uuid),
}

/// A connection registered with the server. `user_id` is `None` for anonymous product viewers.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub addr: Recipient<ServerMessage>,
}

/// Connection closed; every room it joined is released
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: Uuid,
}

/// Returns `false` when the connection was already in the room
#[derive(Message)]
#[rtype(result = "bool")]
pub struct JoinRoom {
    pub session_id: Uuid,
    pub room: Room,
}

#[derive(Message)]
#[rtype(result = "bool")]
pub struct LeaveRoom {
    pub session_id: Uuid,
    pub room: Room,
}

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct BroadcastToRoom {
    pub room: Room,
    pub message: ServerMessage,
    /// Connection that originated the event and should not get it echoed
    pub skip_session: Option<Uuid>,
}

/// Deliver to every connection of the given users, whatever rooms they are in
#[derive(Message)]
#[rtype(result = "()")]
pub struct SendToUsers {
    pub user_ids: Vec<Uuid>,
    pub message: ServerMessage,
}
