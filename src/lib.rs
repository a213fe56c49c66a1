//! # Rentadda Chat
//!
//! Booking chat client for the Rentadda rental marketplace. Once an owner
//! accepts a booking, renter and owner can message each other; this crate
//! resolves the booking's chat room, keeps its message list in sync with the
//! server, and sends new messages.
//!
//! ## Modules
//!
//! - [`api`]: REST client for the marketplace chat endpoints
//! - [`chat`]: Room lifecycle, polling, sending and rendering
//! - [`session`]: Shared session and user identity
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rentadda_chat::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let api = Arc::new(HttpChatClient::new(config.api.clone())?);
//!     let session = SessionContext::with_session(Session::new("<token>"));
//!
//!     let room = ChatRoom::mount(api, session, BookingId(42), config.chat.clone());
//!
//!     room.set_draft("Is the tent still available on Saturday?");
//!     room.send().await?;
//!
//!     room.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod logging;
pub mod session;

pub use api::{ApiError, ApiResult, ChatApi, ErrorKind, HttpChatClient};

pub use chat::{
    BookingId, ChatError, ChatResult, ChatRoom, ChatRoomId, ChatState, Message, MessageId,
    Phase, PollActivity, SendOutcome, UserId, ViewState, WaitReason,
};

pub use config::{
    ApiConfig, ChatConfig, Config, ConfigError, ConfigSource, LoggingConfig, SessionConfig,
};

pub use session::{Session, SessionContext};
