//! Chat Room
//!
//! Ties room resolution, polling and sending to one booking. Mounting spawns a
//! driver task that follows the session: it resolves the room when a token
//! becomes available, keeps exactly one poller running while the room is
//! known, and tears everything down on unmount.

use super::error::ChatResult;
use super::poller::{PollActivity, PollHandle};
use super::sender::SendOutcome;
use super::state::{ChatState, Phase, ViewState, WaitReason};
use super::types::{BookingId, ChatRoomId, Message};
use crate::api::{ApiError, ChatApi, ErrorKind};
use crate::config::ChatConfig;
use crate::session::{Session, SessionContext};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;

/// State and collaborators shared by the driver, poller and sender
pub(crate) struct RoomCore {
    pub(crate) booking: BookingId,
    pub(crate) api: Arc<dyn ChatApi>,
    pub(crate) session: SessionContext,
    pub(crate) config: ChatConfig,
    pub(crate) state: watch::Sender<ChatState>,
    pub(crate) activity: Arc<PollActivity>,
}

impl RoomCore {
    pub(crate) fn room(&self) -> Option<ChatRoomId> {
        self.state.borrow().room
    }

    /// Mutate state and notify observers; no-op once torn down
    pub(crate) fn update(&self, f: impl FnOnce(&mut ChatState)) {
        self.state.send_if_modified(|s| {
            if s.is_torn_down() {
                return false;
            }
            f(s);
            true
        });
    }

    /// Fetch the message list and make it the new snapshot
    pub(crate) async fn refresh(&self, session: &Session, room: ChatRoomId) -> Result<(), ApiError> {
        let messages = self.api.list_messages(session, room).await?;
        self.apply_messages(messages);
        Ok(())
    }

    fn apply_messages(&self, messages: Vec<Message>) {
        let count = messages.len();
        self.update(|s| {
            s.messages = Arc::from(messages);
            s.view = ViewState::Ready;
            s.last_synced = Some(Utc::now());
            s.notice = None;
        });
        tracing::trace!(booking_id = %self.booking, count, "Messages refreshed");
    }

    /// Keep the stale list and flag the failure
    ///
    /// Leaves `phase` alone; only the poll task decides when polling ends.
    pub(crate) fn record_refresh_error(&self, err: &ApiError, session: &Arc<Session>) {
        match err.kind() {
            ErrorKind::Fatal => {
                tracing::error!(booking_id = %self.booking, error = %err, "Message refresh rejected");
                self.update(|s| {
                    s.view = ViewState::Error(ErrorKind::Fatal);
                    s.notice = Some(err.to_string());
                });
                self.escalate(err, session, "message refresh unauthorized");
            }
            ErrorKind::Transient | ErrorKind::NotAvailable => {
                tracing::warn!(booking_id = %self.booking, error = %err, "Message refresh failed");
                self.update(|s| {
                    s.view = ViewState::Error(ErrorKind::Transient);
                    s.notice = Some(format!("Connection problem, showing older messages: {err}"));
                });
            }
        }
    }

    /// Hand a rejected token back to the session layer
    ///
    /// `session` is the one the failed request carried, not whatever is
    /// current now.
    pub(crate) fn escalate(&self, err: &ApiError, session: &Arc<Session>, reason: &str) {
        if matches!(err, ApiError::Unauthorized { .. }) {
            self.session.invalidate(session, reason);
        }
    }

    fn session_lost(&self) {
        self.update(|s| {
            s.phase = if s.room.is_some() {
                Phase::Idle
            } else {
                Phase::Unresolved
            };
            if s.view != ViewState::Error(ErrorKind::Fatal) {
                s.view = ViewState::Waiting(WaitReason::Session);
            }
        });
    }

    fn tear_down(&self) {
        self.state.send_modify(|s| s.phase = Phase::TornDown);
        tracing::debug!(booking_id = %self.booking, "Chat room torn down");
    }
}

/// A mounted chat room for one booking
///
/// Must be created inside a tokio runtime.
pub struct ChatRoom {
    core: Arc<RoomCore>,
    retry: Arc<Notify>,
    shutdown: Option<oneshot::Sender<()>>,
    driver: Option<JoinHandle<()>>,
}

impl ChatRoom {
    /// Mount the room and start following the session
    pub fn mount(
        api: Arc<dyn ChatApi>,
        session: SessionContext,
        booking: BookingId,
        config: ChatConfig,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::new(booking));
        let core = Arc::new(RoomCore {
            booking,
            api,
            session,
            config,
            state,
            activity: Arc::new(PollActivity::default()),
        });
        let retry = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tracing::info!(booking_id = %booking, "Mounting chat room");
        let driver = tokio::spawn(drive(Arc::clone(&core), Arc::clone(&retry), shutdown_rx));

        Self {
            core,
            retry,
            shutdown: Some(shutdown_tx),
            driver: Some(driver),
        }
    }

    pub fn booking(&self) -> BookingId {
        self.core.booking
    }

    /// Current snapshot
    pub fn state(&self) -> ChatState {
        self.core.state.borrow().clone()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.core.state.subscribe()
    }

    pub fn activity(&self) -> Arc<PollActivity> {
        Arc::clone(&self.core.activity)
    }

    /// Replace the compose box contents
    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.core.update(|s| s.draft = text);
    }

    /// Send the compose box contents
    ///
    /// Blank drafts are skipped without any request. After a successful
    /// send the message list is refreshed immediately.
    pub async fn send(&self) -> ChatResult<SendOutcome> {
        self.core.send_draft().await
    }

    /// Try resolving again (or restart polling) without waiting for a new session
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    /// Stop polling and wait for the driver to finish
    pub async fn unmount(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!(booking_id = %self.core.booking, error = %e, "Chat room driver failed");
            }
        }
    }
}

impl Drop for ChatRoom {
    fn drop(&mut self) {
        // Dropping the shutdown sender wakes the driver, which cleans up
        self.shutdown.take();
    }
}

async fn drive(core: Arc<RoomCore>, retry: Arc<Notify>, mut shutdown: oneshot::Receiver<()>) {
    let mut sessions = core.session.subscribe();
    let mut poller: Option<PollHandle> = None;

    loop {
        let session = sessions.borrow_and_update().clone();

        // at most one poller per room
        if let Some(previous) = poller.take() {
            previous.stop().await;
        }

        match session {
            None => core.session_lost(),
            Some(session) => {
                let room = tokio::select! {
                    room = core.resolve_room(&session) => room,
                    _ = &mut shutdown => break,
                };
                if let Some(room) = room {
                    poller = Some(PollHandle::start(Arc::clone(&core), session, room));
                }
            }
        }

        tokio::select! {
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = retry.notified() => {
                tracing::debug!(booking_id = %core.booking, "Retry requested");
            }
            _ = &mut shutdown => break,
        }
    }

    if let Some(poller) = poller.take() {
        poller.stop().await;
    }
    core.tear_down();
}
