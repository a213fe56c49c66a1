//! Chat domain types
//!
//! Identifiers are opaque numbers assigned by the marketplace backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

id_type!(
    /// A renter's booking of an owner's item
    BookingId
);
id_type!(
    /// Messaging channel created once a booking is accepted
    ChatRoomId
);
id_type!(MessageId);
id_type!(UserId);

/// A chat message as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(id: u64, sender_id: u64, content: impl Into<String>) -> Self {
        Self {
            id: MessageId(id),
            sender_id: UserId(sender_id),
            content: content.into(),
            created_at: None,
        }
    }

    /// Whether `me` wrote this message
    pub fn is_from(&self, me: Option<UserId>) -> bool {
        me == Some(self.sender_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_booking_id() {
        assert_eq!("42".parse::<BookingId>().unwrap(), BookingId(42));
        assert_eq!(" 7 ".parse::<BookingId>().unwrap(), BookingId(7));
        assert!("abc".parse::<BookingId>().is_err());
        assert!("-1".parse::<BookingId>().is_err());
    }

    #[test]
    fn test_message_wire_format() {
        let json = r#"{"id":1,"senderId":5,"content":"hi","chatRoomId":7,"createdAt":"2024-05-01T10:00:00Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId(1));
        assert_eq!(msg.sender_id, UserId(5));
        assert_eq!(msg.content, "hi");
        assert!(msg.created_at.is_some());

        let value = serde_json::to_value(Message::new(2, 3, "yo")).unwrap();
        assert_eq!(value, serde_json::json!({"id": 2, "senderId": 3, "content": "yo"}));
    }

    #[test]
    fn test_is_from() {
        let msg = Message::new(1, 5, "hi");
        assert!(msg.is_from(Some(UserId(5))));
        assert!(!msg.is_from(Some(UserId(6))));
        assert!(!msg.is_from(None));
    }
}
