//! Chat room state published to renderers

use super::types::{BookingId, ChatRoomId, Message};
use crate::api::ErrorKind;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Room/poll lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No room id yet
    Unresolved,
    /// Room known and a poll task is running
    Polling,
    /// Room known but polling is paused (no session, or the token was rejected)
    Idle,
    /// Unmounted; terminal
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Nobody is logged in
    Session,
    /// The booking has no chat room until the owner accepts it
    Acceptance,
}

/// What the render layer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Waiting(WaitReason),
    Ready,
    Error(ErrorKind),
}

/// Snapshot of one chat room
#[derive(Debug, Clone)]
pub struct ChatState {
    pub booking: BookingId,
    pub room: Option<ChatRoomId>,
    /// Latest server snapshot; replaced wholesale, never merged
    pub messages: Arc<[Message]>,
    /// Compose box contents
    pub draft: String,
    /// A send is waiting for the server
    pub sending: bool,
    pub phase: Phase,
    pub view: ViewState,
    pub last_synced: Option<DateTime<Utc>>,
    /// Human-readable note about the last failure
    pub notice: Option<String>,
}

impl ChatState {
    pub fn new(booking: BookingId) -> Self {
        Self {
            booking,
            room: None,
            messages: Arc::from(Vec::new()),
            draft: String::new(),
            sending: false,
            phase: Phase::Unresolved,
            view: ViewState::Loading,
            last_synced: None,
            notice: None,
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.phase == Phase::TornDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = ChatState::new(BookingId(42));
        assert_eq!(state.phase, Phase::Unresolved);
        assert_eq!(state.view, ViewState::Loading);
        assert!(state.room.is_none());
        assert!(state.messages.is_empty());
        assert!(!state.sending);
        assert!(!state.is_torn_down());
    }
}
