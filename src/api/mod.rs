//! Marketplace API
//!
//! Client side of the chat endpoints:
//!
//! | Operation     | Method | Path                          |
//! |---------------|--------|-------------------------------|
//! | Resolve room  | GET    | `/chat/room/{bookingId}`      |
//! | List messages | GET    | `/chat/messages/{chatRoomId}` |
//! | Send message  | POST   | `/chat/send`                  |
//!
//! Every request carries `Authorization: Bearer <token>`.

mod client;
pub mod dto;
mod error;

pub use client::{ChatApi, HttpChatClient};
pub use error::{ApiError, ApiResult, ErrorKind};
