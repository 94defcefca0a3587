/// Realtime wire protocol. Every frame is a JSON object tagged by `type`.
use actix::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::order::schema::OrderStatus;

/// Frames accepted on `/ws/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { conversation_id: Uuid },

    #[serde(rename = "leave", rename_all = "camelCase")]
    Leave { conversation_id: Uuid },

    #[serde(rename = "message:send", rename_all = "camelCase")]
    SendMessage { conversation_id: Uuid, content: String },

    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { conversation_id: Uuid, is_typing: bool },

    #[serde(rename = "read", rename_all = "camelCase")]
    Read { conversation_id: Uuid, last_message_id: i64 },

    #[serde(rename = "ping")]
    Ping,
}

/// Frames accepted on `/ws/products`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProductClientMessage {
    #[serde(rename = "product:join", rename_all = "camelCase")]
    Join { product_id: Uuid },

    #[serde(rename = "product:leave", rename_all = "camelCase")]
    Leave { product_id: Uuid },

    #[serde(rename = "ping")]
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "joined", rename_all = "camelCase")]
    Joined { conversation_id: Uuid },

    /// `message` is the persisted message as returned by the HTTP API
    #[serde(rename = "message:new", rename_all = "camelCase")]
    NewMessage { conversation_id: Uuid, message: serde_json::Value },

    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { conversation_id: Uuid, user_id: Uuid, is_typing: bool },

    #[serde(rename = "read", rename_all = "camelCase")]
    Read { conversation_id: Uuid, user_id: Uuid, last_message_id: i64 },

    #[serde(rename = "order:status", rename_all = "camelCase")]
    OrderStatusChanged { order_id: Uuid, status: OrderStatus },

    #[serde(rename = "product:joined", rename_all = "camelCase")]
    ProductJoined { product_id: Uuid },

    #[serde(rename = "review:created", rename_all = "camelCase")]
    ReviewCreated { product_id: Uuid, rating_avg: f64, rating_count: i32 },

    #[serde(rename = "pong")]
    Pong,

    /// Protocol-level rejection (malformed frame, forbidden join)
    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_chat_frames() {
        let id = Uuid::now_v7();
        let frame = json!({"type": "typing", "conversationId": id, "isTyping": true});
        match serde_json::from_value::<ClientMessage>(frame).unwrap() {
            ClientMessage::Typing { conversation_id, is_typing } => {
                assert_eq!(conversation_id, id);
                assert!(is_typing);
            }
            other => panic!("unexpected frame {other:?}"),
        }

        let frame = json!({"type": "message:send", "conversationId": id, "content": "hi"});
        assert!(matches!(
            serde_json::from_value::<ClientMessage>(frame).unwrap(),
            ClientMessage::SendMessage { content, .. } if content == "hi"
        ));

        let frame = json!({"type": "read", "conversationId": id, "lastMessageId": 42});
        assert!(matches!(
            serde_json::from_value::<ClientMessage>(frame).unwrap(),
            ClientMessage::Read { last_message_id: 42, .. }
        ));
    }

    #[test]
    fn rejects_unknown_or_incomplete_frames() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"auth","token":"x"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"join"}"#).is_err());
        assert!(serde_json::from_str::<ProductClientMessage>(r#"{"type":"join"}"#).is_err());
    }

    #[test]
    fn product_frames_use_prefixed_names() {
        let id = Uuid::now_v7();
        let frame = json!({"type": "product:join", "productId": id});
        assert!(matches!(
            serde_json::from_value::<ProductClientMessage>(frame).unwrap(),
            ProductClientMessage::Join { product_id } if product_id == id
        ));
    }

    #[test]
    fn server_frames_serialize_with_event_names() {
        let product_id = Uuid::now_v7();
        let value = serde_json::to_value(ServerMessage::ReviewCreated {
            product_id,
            rating_avg: 4.0,
            rating_count: 3,
        })
        .unwrap();
        let expected = json!({
            "type": "review:created",
            "productId": product_id,
            "ratingAvg": 4.0,
            "ratingCount": 3
        });
        assert_eq!(value, expected);

        let order_id = Uuid::now_v7();
        let value = serde_json::to_value(ServerMessage::OrderStatusChanged {
            order_id,
            status: OrderStatus::Shipped,
        })
        .unwrap();
        let expected = json!({"type": "order:status", "orderId": order_id, "status": "shipped"});
        assert_eq!(value, expected);

        assert_eq!(serde_json::to_value(ServerMessage::Pong).unwrap(), json!({"type": "pong"}));
    }
}
