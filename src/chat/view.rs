//! Rendering and scroll sync
//!
//! Turns a [`ChatState`] into what the user should see. Nothing here mutates
//! chat state.

use super::state::{ChatState, ViewState, WaitReason};
use super::types::{Message, MessageId, UserId};
use crate::api::ErrorKind;
use std::collections::HashSet;
use std::sync::Arc;

pub const WAITING_FOR_ACCEPTANCE: &str = "Chat not available yet. Waiting for acceptance…";
pub const WAITING_FOR_SESSION: &str = "Sign in to open this chat.";

/// Which side of the conversation a message sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Sent by the current user; aligned right
    Mine,
    /// Sent by the other party; aligned left
    Theirs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub side: Side,
    pub content: String,
}

impl RenderedMessage {
    fn from_message(message: &Message, me: Option<UserId>) -> Self {
        Self {
            id: message.id,
            side: if message.is_from(me) {
                Side::Mine
            } else {
                Side::Theirs
            },
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatView {
    Loading,
    Waiting {
        banner: &'static str,
    },
    Ready {
        title: String,
        messages: Vec<RenderedMessage>,
        notice: Option<String>,
    },
    Failed {
        title: String,
        kind: ErrorKind,
        messages: Vec<RenderedMessage>,
        notice: Option<String>,
    },
}

/// Build the view for `state` as seen by `me`
pub fn render(state: &ChatState, me: Option<UserId>) -> ChatView {
    let title = format!("Chat Room (Booking #{})", state.booking);
    let messages = || {
        state
            .messages
            .iter()
            .map(|m| RenderedMessage::from_message(m, me))
            .collect::<Vec<_>>()
    };

    match (state.room, state.view) {
        (_, ViewState::Error(kind)) => ChatView::Failed {
            title,
            kind,
            messages: messages(),
            notice: state.notice.clone(),
        },
        (_, ViewState::Waiting(WaitReason::Session)) => ChatView::Waiting {
            banner: WAITING_FOR_SESSION,
        },
        (None, ViewState::Loading) => ChatView::Loading,
        (None, _) => ChatView::Waiting {
            banner: WAITING_FOR_ACCEPTANCE,
        },
        (Some(_), _) => ChatView::Ready {
            title,
            messages: messages(),
            notice: state.notice.clone(),
        },
    }
}

/// Format one message for a terminal of `width` columns
pub fn format_line(message: &RenderedMessage, width: usize) -> String {
    match message.side {
        Side::Mine => format!("{:>width$}", message.content, width = width),
        Side::Theirs => message.content.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
}

/// Ask the viewport to bring a message into view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub target: MessageId,
    pub behavior: ScrollBehavior,
}

/// Keeps the viewport pinned to the newest message
///
/// Fires whenever the message list is replaced, compared by identity.
#[derive(Debug, Default)]
pub struct ScrollSync {
    behavior: ScrollBehavior,
    seen: Option<Arc<[Message]>>,
}

impl ScrollSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: ScrollBehavior) -> Self {
        Self {
            behavior,
            seen: None,
        }
    }

    pub fn observe(&mut self, state: &ChatState) -> Option<ScrollRequest> {
        if let Some(seen) = &self.seen {
            if Arc::ptr_eq(seen, &state.messages) {
                return None;
            }
        }
        self.seen = Some(Arc::clone(&state.messages));

        state.messages.last().map(|newest| ScrollRequest {
            target: newest.id,
            behavior: self.behavior,
        })
    }
}

/// Append-only transcript for line-oriented output
#[derive(Debug, Default)]
pub struct Transcript {
    printed: HashSet<MessageId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages not yet printed, in list order
    pub fn fresh<'a>(&mut self, messages: &'a [RenderedMessage]) -> Vec<&'a RenderedMessage> {
        messages
            .iter()
            .filter(|m| self.printed.insert(m.id))
            .collect()
    }
}
