//! Chat error types

use crate::api::{ApiError, ErrorKind};
use thiserror::Error;

/// Errors surfaced by [`ChatRoom`](super::ChatRoom) operations
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Not signed in")]
    NoSession,

    #[error("Chat room not available yet")]
    RoomUnresolved,

    #[error("Chat room has been closed")]
    TornDown,

    #[error("A message is already being sent")]
    SendInProgress,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::NoSession | ChatError::TornDown => ErrorKind::Fatal,
            ChatError::RoomUnresolved => ErrorKind::NotAvailable,
            ChatError::SendInProgress => ErrorKind::Transient,
            ChatError::Api(e) => e.kind(),
        }
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
