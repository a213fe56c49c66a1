//! Message polling
//!
//! A [`PollHandle`] owns the task that refreshes a room's message list on a
//! fixed period. The task lives exactly as long as the handle: `stop()`
//! cancels and joins it, dropping the handle aborts it.

use super::room::RoomCore;
use super::state::Phase;
use super::types::ChatRoomId;
use crate::api::ErrorKind;
use crate::session::Session;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Counts poll tasks for a room
#[derive(Debug, Default)]
pub struct PollActivity {
    active: AtomicUsize,
    started: AtomicUsize,
}

impl PollActivity {
    /// Poll tasks currently alive
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Poll tasks started since mount
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

/// Held by a running poll task; released when the task's future is dropped
struct ActiveGuard(Arc<PollActivity>);

impl ActiveGuard {
    fn acquire(activity: Arc<PollActivity>) -> Self {
        activity.active.fetch_add(1, Ordering::SeqCst);
        activity.started.fetch_add(1, Ordering::SeqCst);
        Self(activity)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a running message poller
pub(crate) struct PollHandle {
    room: ChatRoomId,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn the poll loop; the first fetch happens immediately
    pub(crate) fn start(core: Arc<RoomCore>, session: Arc<Session>, room: ChatRoomId) -> Self {
        let guard = ActiveGuard::acquire(Arc::clone(&core.activity));
        let period = core.config.poll_interval();

        core.update(|s| s.phase = Phase::Polling);
        tracing::debug!(room_id = %room, period_ms = period.as_millis() as u64, "Starting message poller");

        let task = tokio::spawn(async move {
            let _guard = guard;
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if let Err(e) = core.refresh(&session, room).await {
                    core.record_refresh_error(&e, &session);
                    if e.kind() == ErrorKind::Fatal {
                        core.update(|s| s.phase = Phase::Idle);
                        tracing::warn!(room_id = %room, "Message poller stopped");
                        break;
                    }
                }
            }
        });

        Self {
            room,
            task: Some(task),
        }
    }

    /// Cancel the poll task and wait until it is gone
    pub(crate) async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            tracing::debug!(room_id = %self.room, "Message poller stopped");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
