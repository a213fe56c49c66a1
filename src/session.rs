//! Session Context
//!
//! Holds the bearer token issued at login together with the identity of the
//! current user. Components share one [`SessionContext`] and react when the
//! token appears, changes, or is revoked.

use crate::chat::UserId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// An authenticated user session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user_id: Option<UserId>,
}

impl Session {
    /// Create a session from a bearer token
    ///
    /// The user id is read from the token's `id` claim when the token is a
    /// JWT; opaque tokens leave it unset.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let user_id = user_id_from_jwt(&token);
        Self { token, user_id }
    }

    /// Override the user id
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Deserialize)]
struct Claims {
    id: Option<serde_json::Value>,
}

fn user_id_from_jwt(token: &str) -> Option<UserId> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    match claims.id? {
        serde_json::Value::Number(n) => n.as_u64().map(UserId),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Shared, observable slot for the current session
#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<Option<Arc<Session>>>>,
}

impl SessionContext {
    /// Create a context with no active session
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a context that starts logged in
    pub fn with_session(session: Session) -> Self {
        let ctx = Self::new();
        ctx.login(session);
        ctx
    }

    pub fn login(&self, session: Session) {
        tracing::info!(user_id = ?session.user_id(), "Session started");
        self.tx.send_replace(Some(Arc::new(session)));
    }

    pub fn logout(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::info!("Session ended");
        }
    }

    /// Drop `rejected` after the server refused its token
    ///
    /// Only clears the slot while `rejected` is still the current session; a
    /// login that happened while the failing request was in flight is kept.
    /// Returns whether the session was cleared.
    pub fn invalidate(&self, rejected: &Arc<Session>, reason: &str) -> bool {
        let cleared = self.tx.send_if_modified(|current| {
            let is_rejected = current
                .as_ref()
                .is_some_and(|session| Arc::ptr_eq(session, rejected));
            if is_rejected {
                *current = None;
            }
            is_rejected
        });

        if cleared {
            tracing::warn!(reason, "Session invalidated, re-authentication required");
        } else {
            tracing::debug!(reason, "Rejected session already replaced");
        }
        cleared
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.tx.subscribe()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("session", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_user_id_from_numeric_claim() {
        let session = Session::new(jwt(r#"{"id":5,"iat":1700000000}"#));
        assert_eq!(session.user_id(), Some(UserId(5)));
    }

    #[test]
    fn test_user_id_from_string_claim() {
        let session = Session::new(jwt(r#"{"id":"12"}"#));
        assert_eq!(session.user_id(), Some(UserId(12)));
    }

    #[test]
    fn test_opaque_token_has_no_user() {
        assert_eq!(Session::new("not-a-jwt").user_id(), None);
        assert_eq!(Session::new("a.%%%.c").user_id(), None);
        assert_eq!(Session::new(jwt(r#"{"sub":"x"}"#)).user_id(), None);
    }

    #[test]
    fn test_explicit_user_id_wins() {
        let session = Session::new(jwt(r#"{"id":5}"#)).with_user_id(UserId(9));
        assert_eq!(session.user_id(), Some(UserId(9)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let output = format!("{:?}", Session::new("secret-token"));
        assert!(!output.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_context_notifies_subscribers() {
        let ctx = SessionContext::new();
        let mut rx = ctx.subscribe();
        assert!(rx.borrow_and_update().is_none());

        ctx.login(Session::new("t1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().token(), "t1");

        let rejected = ctx.current().unwrap();
        assert!(ctx.invalidate(&rejected, "expired"));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
        assert!(ctx.current().is_none());
    }

    #[test]
    fn test_invalidate_keeps_newer_login() {
        let ctx = SessionContext::with_session(Session::new("old"));
        let rejected = ctx.current().unwrap();

        ctx.login(Session::new("fresh"));
        assert!(!ctx.invalidate(&rejected, "expired"));
        assert_eq!(ctx.current().unwrap().token(), "fresh");

        // same token, new login: still a different session
        ctx.login(Session::new("old"));
        assert!(!ctx.invalidate(&rejected, "expired"));
        assert!(ctx.current().is_some());
    }
}
