//! Room resolution
//!
//! Maps a booking to its chat room. A room id, once learned, is kept for the
//! lifetime of the [`ChatRoom`](super::ChatRoom).

use super::room::RoomCore;
use super::state::{ViewState, WaitReason};
use super::types::ChatRoomId;
use crate::api::ErrorKind;
use crate::session::Session;
use std::sync::Arc;

impl RoomCore {
    /// Look up the room once; `None` leaves the poller unstarted
    pub(crate) async fn resolve_room(&self, session: &Arc<Session>) -> Option<ChatRoomId> {
        if let Some(room) = self.room() {
            return Some(room);
        }

        self.update(|s| s.view = ViewState::Loading);

        match self.api.resolve_room(session, self.booking).await {
            Ok(room) => {
                tracing::info!(booking_id = %self.booking, room_id = %room, "Chat room resolved");
                self.update(|s| {
                    s.room.get_or_insert(room);
                    s.notice = None;
                });
                self.room()
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::NotAvailable => {
                        tracing::info!(booking_id = %self.booking, "Chat room not available yet");
                        self.update(|s| s.view = ViewState::Waiting(WaitReason::Acceptance));
                    }
                    ErrorKind::Transient => {
                        tracing::warn!(booking_id = %self.booking, error = %e, "Chat room lookup failed");
                        self.update(|s| {
                            s.view = ViewState::Error(ErrorKind::Transient);
                            s.notice = Some(format!("Could not reach the chat service: {e}"));
                        });
                    }
                    ErrorKind::Fatal => {
                        tracing::error!(booking_id = %self.booking, error = %e, "Chat room lookup rejected");
                        self.update(|s| {
                            s.view = ViewState::Error(ErrorKind::Fatal);
                            s.notice = Some(e.to_string());
                        });
                        self.escalate(&e, session, "chat room lookup unauthorized");
                    }
                }
                None
            }
        }
    }
}
