/// Realtime module
///
/// - wire protocol (`ClientMessage`, `ProductClientMessage`, `ServerMessage`)
/// - server actor owning connections and rooms
/// - one session actor per socket (chat participants, product viewers)
/// - HTTP upgrade handlers and the socket pump
pub mod events;
pub mod handler;
pub mod membership;
pub mod message;
pub mod server;
pub mod session;
#[cfg(test)]
pub mod testing;
pub mod typing;
