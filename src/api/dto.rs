//! Data Transfer Objects
//!
//! Request and response bodies of the chat endpoints.

use crate::chat::{ChatRoomId, Message};
use serde::{Deserialize, Serialize};

// ============================================
// CHAT ROOM DTOs
// ============================================

/// `GET /chat/room/{bookingId}` response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    /// Absent or null while the booking has no room
    #[serde(default)]
    pub chat_room_id: Option<ChatRoomId>,
}

// ============================================
// MESSAGE DTOs
// ============================================

/// `GET /chat/messages/{chatRoomId}` response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// `POST /chat/send` request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_room_id: ChatRoomId,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_response_null() {
        let resp: RoomResponse = serde_json::from_str(r#"{"chatRoomId":null}"#).unwrap();
        assert!(resp.chat_room_id.is_none());

        let resp: RoomResponse = serde_json::from_str(r#"{"chatRoomId":7}"#).unwrap();
        assert_eq!(resp.chat_room_id, Some(ChatRoomId(7)));
    }

    #[test]
    fn test_send_request_shape() {
        let body = SendMessageRequest {
            chat_room_id: ChatRoomId(7),
            content: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"chatRoomId": 7, "content": "hello"})
        );
    }
}
