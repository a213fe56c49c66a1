//! Message sending

use super::error::{ChatError, ChatResult};
use super::room::RoomCore;
use super::state::ChatState;
use super::types::ChatRoomId;
use crate::api::ErrorKind;
use crate::session::Session;
use std::sync::Arc;

/// What [`ChatRoom::send`](super::ChatRoom::send) did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The draft was blank; nothing was sent
    Skipped,
    /// The message was accepted and the list refreshed
    Sent,
}

/// A draft claimed for sending
struct Outgoing {
    content: String,
    room: ChatRoomId,
    session: Arc<Session>,
}

impl RoomCore {
    /// Send the current draft, then refresh out of cycle
    ///
    /// The draft stays in the compose box until the server accepts it, so a
    /// failed send leaves it ready to resend.
    pub(crate) async fn send_draft(&self) -> ChatResult<SendOutcome> {
        let mut claimed = Ok(None);
        self.state.send_if_modified(|s| {
            claimed = self.claim_draft(s);
            matches!(claimed, Ok(Some(_)))
        });
        let Some(Outgoing {
            content,
            room,
            session,
        }) = claimed?
        else {
            return Ok(SendOutcome::Skipped);
        };

        if let Err(e) = self.api.send_message(&session, room, &content).await {
            tracing::warn!(room_id = %room, error = %e, "Message not sent");
            self.update(|s| {
                s.sending = false;
                s.notice = Some(format!("Message not sent: {e}"));
            });
            if e.kind() == ErrorKind::Fatal {
                self.escalate(&e, &session, "message send unauthorized");
            }
            return Err(e.into());
        }

        tracing::debug!(room_id = %room, "Message sent");
        self.update(|s| {
            s.sending = false;
            // keep anything typed while the send was in flight
            if s.draft == content {
                s.draft.clear();
            }
        });

        // The send itself succeeded; a failed refresh is left to the poller
        if let Err(e) = self.refresh(&session, room).await {
            self.record_refresh_error(&e, &session);
        }

        Ok(SendOutcome::Sent)
    }

    /// Check the draft can go out and mark it in flight
    fn claim_draft(&self, s: &mut ChatState) -> ChatResult<Option<Outgoing>> {
        if s.draft.trim().is_empty() {
            return Ok(None);
        }
        if s.is_torn_down() {
            return Err(ChatError::TornDown);
        }
        if s.sending {
            return Err(ChatError::SendInProgress);
        }
        let session = self.session.current().ok_or(ChatError::NoSession)?;
        let room = s.room.ok_or(ChatError::RoomUnresolved)?;

        s.sending = true;
        s.notice = None;
        Ok(Some(Outgoing {
            content: s.draft.clone(),
            room,
            session,
        }))
    }
}
