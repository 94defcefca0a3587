//! Test doubles for the realtime layer
use actix::prelude::*;
use uuid::Uuid;

use super::events::{Connect, JoinRoom, LeaveRoom, Room};
use super::message::ServerMessage;
use super::server::RealtimeServer;

/// Stands in for a connection and records what it was sent
#[derive(Default)]
pub struct Collector {
    received: Vec<ServerMessage>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<ServerMessage> for Collector {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _: &mut Context<Self>) {
        self.received.push(msg);
    }
}

#[derive(Message)]
#[rtype(result = "Vec<ServerMessage>")]
pub struct Drain;

impl Handler<Drain> for Collector {
    type Result = Vec<ServerMessage>;

    fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Self::Result {
        std::mem::take(&mut self.received)
    }
}

pub async fn connect(
    server: &Addr<RealtimeServer>,
    user_id: Option<Uuid>,
) -> (Uuid, Addr<Collector>) {
    let id = Uuid::now_v7();
    let collector = Collector::default().start();
    server
        .send(Connect { id, user_id, addr: collector.clone().recipient() })
        .await
        .unwrap();
    (id, collector)
}

/// Connection already sitting in `room`
pub async fn member_of(server: &Addr<RealtimeServer>, room: Room) -> Addr<Collector> {
    let (id, collector) = connect(server, Some(Uuid::now_v7())).await;
    server.send(JoinRoom { session_id: id, room }).await.unwrap();
    collector
}

/// Waits until everything queued on the server so far has been handled
pub async fn flush(server: &Addr<RealtimeServer>) {
    server
        .send(LeaveRoom { session_id: Uuid::nil(), room: Room::Product(Uuid::nil()) })
        .await
        .unwrap();
}
