/// Realtime server actor
///
/// Owns every live connection and the room membership table. All fan-out
/// goes through this single actor, so events published to one room reach
/// each member in the order the server received them.
use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::events::*;
use super::message::ServerMessage;

struct Connection {
    user_id: Option<Uuid>,
    addr: Recipient<ServerMessage>,
    rooms: HashSet<Room>,
}

pub struct RealtimeServer {
    /// session_id -> connection
    sessions: HashMap<Uuid, Connection>,

    /// user_id -> session_ids; one user may hold several tabs/devices
    users: HashMap<Uuid, HashSet<Uuid>>,

    /// room -> session_ids
    rooms: HashMap<Room, HashSet<Uuid>>,
}

impl RealtimeServer {
    pub fn new() -> Self {
        Self { sessions: HashMap::new(), users: HashMap::new(), rooms: HashMap::new() }
    }

    fn send_to_session(&self, session_id: &Uuid, message: ServerMessage) {
        if let Some(conn) = self.sessions.get(session_id) {
            conn.addr.do_send(message);
        }
    }

    fn remove_from_room(&mut self, session_id: &Uuid, room: &Room) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(session_id);
        if members.is_empty() {
            self.rooms.remove(room);
            tracing::debug!("Room {:?} empty, removed", room);
        }
        removed
    }
}

impl Default for RealtimeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for RealtimeServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Realtime server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Realtime server stopped");
    }
}

impl Handler<Connect> for RealtimeServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        tracing::debug!("Session {} connected (user {:?})", msg.id, msg.user_id);

        if let Some(user_id) = msg.user_id {
            self.users.entry(user_id).or_default().insert(msg.id);
        }
        self.sessions.insert(
            msg.id,
            Connection { user_id: msg.user_id, addr: msg.addr, rooms: HashSet::new() },
        );
    }
}

impl Handler<Disconnect> for RealtimeServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        let Some(conn) = self.sessions.remove(&msg.id) else {
            return;
        };

        for room in &conn.rooms {
            self.remove_from_room(&msg.id, room);
        }

        if let Some(user_id) = conn.user_id {
            if let Some(sessions) = self.users.get_mut(&user_id) {
                sessions.remove(&msg.id);
                if sessions.is_empty() {
                    self.users.remove(&user_id);
                }
            }
        }

        tracing::debug!("Session {} disconnected, left {} room(s)", msg.id, conn.rooms.len());
    }
}

impl Handler<JoinRoom> for RealtimeServer {
    type Result = bool;

    fn handle(&mut self, msg: JoinRoom, _: &mut Context<Self>) -> bool {
        let Some(conn) = self.sessions.get_mut(&msg.session_id) else {
            tracing::warn!("Join from unknown session {}", msg.session_id);
            return false;
        };

        if !conn.rooms.insert(msg.room) {
            return false;
        }
        let members = self.rooms.entry(msg.room).or_default();
        members.insert(msg.session_id);

        tracing::debug!(
            "Session {} joined {:?} ({} member(s))",
            msg.session_id,
            msg.room,
            members.len()
        );
        true
    }
}

impl Handler<LeaveRoom> for RealtimeServer {
    type Result = bool;

    fn handle(&mut self, msg: LeaveRoom, _: &mut Context<Self>) -> bool {
        let was_member = self
            .sessions
            .get_mut(&msg.session_id)
            .map(|conn| conn.rooms.remove(&msg.room))
            .unwrap_or(false);

        if was_member {
            self.remove_from_room(&msg.session_id, &msg.room);
        }
        was_member
    }
}

impl Handler<BroadcastToRoom> for RealtimeServer {
    type Result = ();

    fn handle(&mut self, msg: BroadcastToRoom, _: &mut Context<Self>) {
        let Some(members) = self.rooms.get(&msg.room) else {
            tracing::debug!("Broadcast to empty room {:?}", msg.room);
            return;
        };

        let mut sent = 0;
        for session_id in members {
            if msg.skip_session == Some(*session_id) {
                continue;
            }
            self.send_to_session(session_id, msg.message.clone());
            sent += 1;
        }

        tracing::debug!("Broadcast to {:?}: sent to {} session(s)", msg.room, sent);
    }
}

impl Handler<SendToUsers> for RealtimeServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUsers, _: &mut Context<Self>) {
        let mut sent = 0;
        let unique: HashSet<&Uuid> = msg.user_ids.iter().collect();

        for user_id in unique {
            if let Some(session_ids) = self.users.get(user_id) {
                for session_id in session_ids {
                    self.send_to_session(session_id, msg.message.clone());
                    sent += 1;
                }
            }
        }

        tracing::debug!("Sent to {} user(s) ({} session(s))", msg.user_ids.len(), sent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::websocket::testing::{Drain, connect, flush};

    fn typing(conversation_id: Uuid, user_id: Uuid) -> ServerMessage {
        ServerMessage::Typing { conversation_id, user_id, is_typing: true }
    }

    #[actix::test]
    async fn broadcast_reaches_members_except_the_origin() {
        let server = RealtimeServer::new().start();
        let conv = Uuid::now_v7();
        let room = Room::Conversation(conv);
        let (alice, alice_rx) = connect(&server, Some(Uuid::now_v7())).await;
        let (bob, bob_rx) = connect(&server, Some(Uuid::now_v7())).await;
        let (_, outsider_rx) = connect(&server, Some(Uuid::now_v7())).await;

        assert!(server.send(JoinRoom { session_id: alice, room }).await.unwrap());
        assert!(server.send(JoinRoom { session_id: bob, room }).await.unwrap());

        server
            .send(BroadcastToRoom { room, message: typing(conv, alice), skip_session: Some(alice) })
            .await
            .unwrap();

        assert!(alice_rx.send(Drain).await.unwrap().is_empty());
        assert_eq!(bob_rx.send(Drain).await.unwrap().len(), 1);
        assert!(outsider_rx.send(Drain).await.unwrap().is_empty());
    }

    #[actix::test]
    async fn joining_twice_keeps_a_single_membership() {
        let server = RealtimeServer::new().start();
        let room = Room::Product(Uuid::now_v7());
        let (viewer, viewer_rx) = connect(&server, None).await;

        assert!(server.send(JoinRoom { session_id: viewer, room }).await.unwrap());
        assert!(!server.send(JoinRoom { session_id: viewer, room }).await.unwrap());

        server
            .send(BroadcastToRoom { room, message: ServerMessage::Pong, skip_session: None })
            .await
            .unwrap();
        assert_eq!(viewer_rx.send(Drain).await.unwrap().len(), 1);
    }

    #[actix::test]
    async fn room_members_see_publish_order() {
        let server = RealtimeServer::new().start();
        let conv = Uuid::now_v7();
        let room = Room::Conversation(conv);
        let (a, a_rx) = connect(&server, Some(Uuid::now_v7())).await;
        let (b, b_rx) = connect(&server, Some(Uuid::now_v7())).await;
        server.send(JoinRoom { session_id: a, room }).await.unwrap();
        server.send(JoinRoom { session_id: b, room }).await.unwrap();

        for id in 1..=5 {
            server.do_send(BroadcastToRoom {
                room,
                message: ServerMessage::NewMessage {
                    conversation_id: conv,
                    message: serde_json::json!({ "id": id }),
                },
                skip_session: None,
            });
        }
        flush(&server).await;

        for rx in [a_rx, b_rx] {
            let ids: Vec<i64> = rx
                .send(Drain)
                .await
                .unwrap()
                .into_iter()
                .filter_map(|m| match m {
                    ServerMessage::NewMessage { message, .. } => message["id"].as_i64(),
                    _ => None,
                })
                .collect();
            assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        }
    }

    #[actix::test]
    async fn disconnect_releases_rooms() {
        let server = RealtimeServer::new().start();
        let room = Room::Conversation(Uuid::now_v7());
        let user = Uuid::now_v7();
        let (session, rx) = connect(&server, Some(user)).await;
        server.send(JoinRoom { session_id: session, room }).await.unwrap();

        server.send(Disconnect { id: session }).await.unwrap();
        server
            .send(BroadcastToRoom { room, message: ServerMessage::Pong, skip_session: None })
            .await
            .unwrap();
        server
            .send(SendToUsers { user_ids: vec![user], message: ServerMessage::Pong })
            .await
            .unwrap();

        assert!(rx.send(Drain).await.unwrap().is_empty());
        assert!(!server.send(LeaveRoom { session_id: session, room }).await.unwrap());
    }

    #[actix::test]
    async fn send_to_users_hits_every_session_once() {
        let server = RealtimeServer::new().start();
        let user = Uuid::now_v7();
        let (_, phone) = connect(&server, Some(user)).await;
        let (_, laptop) = connect(&server, Some(user)).await;
        let (_, anonymous) = connect(&server, None).await;

        server
            .send(SendToUsers { user_ids: vec![user, user], message: ServerMessage::Pong })
            .await
            .unwrap();

        assert_eq!(phone.send(Drain).await.unwrap().len(), 1);
        assert_eq!(laptop.send(Drain).await.unwrap().len(), 1);
        assert!(anonymous.send(Drain).await.unwrap().is_empty());
    }
}
