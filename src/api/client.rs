//! Marketplace REST API Client
//!
//! HTTP client for the chat endpoints of the marketplace backend.

use super::dto::{MessagesResponse, RoomResponse, SendMessageRequest};
use super::error::{ApiError, ApiResult, ErrorKind};
use crate::chat::{BookingId, ChatRoomId, Message};
use crate::config::ApiConfig;
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

/// Chat operations of the marketplace API
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Look up the chat room created for an accepted booking
    async fn resolve_room(&self, session: &Session, booking: BookingId) -> ApiResult<ChatRoomId>;

    /// Fetch the full message list of a room, in server order
    async fn list_messages(&self, session: &Session, room: ChatRoomId) -> ApiResult<Vec<Message>>;

    /// Post a new message to a room
    async fn send_message(
        &self,
        session: &Session,
        room: ChatRoomId,
        content: &str,
    ) -> ApiResult<()>;
}

/// reqwest-backed [`ChatApi`]
pub struct HttpChatClient {
    client: Client,
    config: ApiConfig,
}

impl HttpChatClient {
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder
            .bearer_auth(session.token())
            .header("X-Request-Id", Uuid::new_v4().to_string())
    }

    /// Wait before retry number `attempt`, never longer than the request timeout
    fn retry_delay(&self, attempt: u32, last_error: &ApiError) -> Duration {
        let delay = match last_error {
            ApiError::RateLimited {
                retry_after_secs: Some(secs),
            } => Duration::from_secs(*secs),
            _ => Duration::from_millis(
                self.config
                    .retry_backoff_ms
                    .saturating_mul(u64::from(attempt).saturating_pow(2)),
            ),
        };
        delay.min(self.config.request_timeout())
    }

    /// GET with retry on transient failures
    async fn get_json<T: DeserializeOwned>(&self, session: &Session, url: &str) -> ApiResult<T> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = ApiError::Unavailable;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay(attempt, &last_error)).await;
            }

            let result = match self
                .authorized(self.client.get(url), session)
                .send()
                .await
            {
                Ok(response) => read_json(response).await,
                Err(e) => Err(ApiError::from_transport(e)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == ErrorKind::Transient => {
                    tracing::debug!(url, attempt, error = %e, "Request failed, will retry");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(url, attempts, error = %last_error, "Request failed after retries");
        Err(last_error)
    }
}

#[async_trait]
impl ChatApi for HttpChatClient {
    async fn resolve_room(&self, session: &Session, booking: BookingId) -> ApiResult<ChatRoomId> {
        let url = self.url(&format!(
            "/chat/room/{}",
            urlencoding::encode(&booking.to_string())
        ));

        let response: RoomResponse = self.get_json(session, &url).await?;
        response.chat_room_id.ok_or(ApiError::NotFound)
    }

    async fn list_messages(&self, session: &Session, room: ChatRoomId) -> ApiResult<Vec<Message>> {
        let url = self.url(&format!(
            "/chat/messages/{}",
            urlencoding::encode(&room.to_string())
        ));

        let response: MessagesResponse = self.get_json(session, &url).await?;
        Ok(response.messages)
    }

    /// Sent exactly once; a retried POST could post the message twice
    async fn send_message(
        &self,
        session: &Session,
        room: ChatRoomId,
        content: &str,
    ) -> ApiResult<()> {
        let url = self.url("/chat/send");
        let body = SendMessageRequest {
            chat_room_id: room,
            content: content.to_string(),
        };

        let response = self
            .authorized(self.client.post(&url), session)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let text = response.text().await.unwrap_or_default();

    match ApiError::from_status(status.as_u16(), text) {
        ApiError::RateLimited { .. } => Err(ApiError::RateLimited { retry_after_secs }),
        other => Err(other),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{MessageId, UserId};
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Backend {
        hits: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        let bearer = headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer tok");
        bearer && headers.contains_key("x-request-id")
    }

    async fn room(
        State(backend): State<Backend>,
        Path(booking): Path<u64>,
        headers: HeaderMap,
    ) -> AxumResponse {
        backend.hits.fetch_add(1, Ordering::SeqCst);
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        match booking {
            42 => Json(serde_json::json!({"chatRoomId": 7})).into_response(),
            43 => Json(serde_json::json!({"chatRoomId": null})).into_response(),
            _ => (StatusCode::NOT_FOUND, "no chat room").into_response(),
        }
    }

    async fn messages(
        State(backend): State<Backend>,
        Path(room): Path<u64>,
        headers: HeaderMap,
    ) -> AxumResponse {
        let hit = backend.hits.fetch_add(1, Ordering::SeqCst);
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        // room 9 is flaky for its first two requests
        if room == 9 && hit < 2 {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        if room == 10 {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        // room 11 rate limits its first request
        if room == 11 && hit == 0 {
            return (StatusCode::TOO_MANY_REQUESTS, [("Retry-After", "1")]).into_response();
        }
        Json(serde_json::json!({
            "messages": [
                {"id": 1, "senderId": 5, "content": "hi"},
                {"id": 2, "senderId": 6, "content": "hello"}
            ]
        }))
        .into_response()
    }

    async fn send(
        State(backend): State<Backend>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> AxumResponse {
        backend.hits.fetch_add(1, Ordering::SeqCst);
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if body["chatRoomId"] == 10 {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        backend.sent.lock().unwrap().push(body);
        (StatusCode::CREATED, Json(serde_json::json!({"message": "sent"}))).into_response()
    }

    async fn spawn_backend() -> (HttpChatClient, Backend) {
        let backend = Backend::default();
        let app = Router::new()
            .route("/chat/room/:booking", get(room))
            .route("/chat/messages/:room", get(messages))
            .route("/chat/send", post(send))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ApiConfig {
            base_url: format!("http://{addr}/"),
            request_timeout_ms: 2000,
            max_retries: 3,
            retry_backoff_ms: 1,
        };
        (HttpChatClient::new(config).unwrap(), backend)
    }

    fn session() -> Session {
        Session::new("tok")
    }

    #[tokio::test]
    async fn test_resolve_room() {
        let (client, _backend) = spawn_backend().await;
        let room = client.resolve_room(&session(), BookingId(42)).await.unwrap();
        assert_eq!(room, ChatRoomId(7));
    }

    #[tokio::test]
    async fn test_resolve_room_not_available() {
        let (client, backend) = spawn_backend().await;

        let err = client.resolve_room(&session(), BookingId(99)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAvailable);

        let err = client.resolve_room(&session(), BookingId(43)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAvailable);

        // not-available is not retried
        assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bad_token_is_fatal_and_not_retried() {
        let (client, backend) = spawn_backend().await;

        let err = client
            .resolve_room(&Session::new("wrong"), BookingId(42))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { status: 401 }));
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_messages() {
        let (client, _backend) = spawn_backend().await;
        let messages = client.list_messages(&session(), ChatRoomId(7)).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId(1));
        assert_eq!(messages[0].sender_id, UserId(5));
        assert_eq!(messages[1].content, "hello");
    }

    #[tokio::test]
    async fn test_list_messages_retries_transient_failures() {
        let (client, backend) = spawn_backend().await;
        let messages = client.list_messages(&session(), ChatRoomId(9)).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_list_messages_gives_up_after_max_retries() {
        let (client, backend) = spawn_backend().await;
        let err = client
            .list_messages(&session(), ChatRoomId(10))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_list_messages_honors_retry_after() {
        let (client, backend) = spawn_backend().await;
        let started = std::time::Instant::now();
        let messages = client.list_messages(&session(), ChatRoomId(11)).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
        // backoff alone would be 1ms
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn test_retry_delay_is_capped_by_timeout() {
        let client = HttpChatClient::new(ApiConfig {
            base_url: "http://127.0.0.1".to_string(),
            request_timeout_ms: 2000,
            max_retries: 3,
            retry_backoff_ms: u64::MAX,
        })
        .unwrap();

        assert_eq!(
            client.retry_delay(2, &ApiError::Unavailable),
            Duration::from_millis(2000)
        );
        let rate_limited = ApiError::RateLimited {
            retry_after_secs: Some(86_400),
        };
        assert_eq!(
            client.retry_delay(1, &rate_limited),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_retry_delay_grows_quadratically() {
        let client = HttpChatClient::new(ApiConfig {
            base_url: "http://127.0.0.1".to_string(),
            request_timeout_ms: 10_000,
            max_retries: 3,
            retry_backoff_ms: 500,
        })
        .unwrap();

        assert_eq!(client.retry_delay(1, &ApiError::Timeout), Duration::from_millis(500));
        assert_eq!(client.retry_delay(2, &ApiError::Timeout), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_fatal() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            request_timeout_ms: 500,
            max_retries: 3,
            retry_backoff_ms: 1,
        };
        let client = HttpChatClient::new(config).unwrap();

        let err = client
            .list_messages(&session(), ChatRoomId(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[tokio::test]
    async fn test_send_message() {
        let (client, backend) = spawn_backend().await;
        client
            .send_message(&session(), ChatRoomId(7), "see you at 5")
            .await
            .unwrap();

        let sent = backend.sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            &[serde_json::json!({"chatRoomId": 7, "content": "see you at 5"})]
        );
    }

    #[tokio::test]
    async fn test_send_message_is_not_retried() {
        let (client, backend) = spawn_backend().await;
        let err = client
            .send_message(&session(), ChatRoomId(10), "hello")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_ms: 500,
            max_retries: 1,
            retry_backoff_ms: 1,
        };
        let client = HttpChatClient::new(config).unwrap();

        let err = client
            .list_messages(&session(), ChatRoomId(7))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}
