//! Booking Chat
//!
//! Client-side flow for the chat attached to an accepted booking.
//!
//! ## Architecture
//!
//! - **Resolver**: looks up the booking's chat room once
//! - **Poller**: refreshes the message list on a fixed period
//! - **Sender**: posts the draft and refreshes out of cycle
//! - **View**: renders state and keeps the newest message in view
//!
//! ## Lifecycle
//!
//! `Unresolved` → `Polling` → `TornDown`. A room id never reverts once known;
//! a new session token restarts polling against the same room.

mod error;
mod poller;
mod resolver;
mod room;
mod sender;
mod state;
mod types;
pub mod view;

pub use error::{ChatError, ChatResult};
pub use poller::PollActivity;
pub use room::ChatRoom;
pub use sender::SendOutcome;
pub use state::{ChatState, Phase, ViewState, WaitReason};
pub use types::{BookingId, ChatRoomId, Message, MessageId, UserId};
