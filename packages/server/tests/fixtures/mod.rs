//! Test fixtures: an in-process server on an ephemeral port plus small
//! HTTP / WebSocket client helpers.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use agora_server::{
    domain::{ChatMessage, ChatMessageRepository, Clock, NewChatMessage, RepositoryError},
    infrastructure::{
        auth::{JwtClaims, JwtCredentialVerifier},
        repository::InMemoryChatMessageRepository,
    },
    ui::{AppState, HubSettings, serve},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::{net::TcpListener, sync::oneshot};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame},
};

pub const SECRET: &[u8] = b"integration-test-secret";

/// How long helpers wait for something that should happen
pub const PATIENCE: Duration = Duration::from_secs(3);

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Wall clock that tests can move forward
pub struct TestClock {
    offset: Mutex<chrono::Duration>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self {
            offset: Mutex::new(chrono::Duration::zero()),
        }
    }
}

impl TestClock {
    pub fn advance(&self, by: chrono::Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + *self.offset.lock().unwrap()
    }
}

/// Store that works normally except that every retention delete fails
pub struct FailingSweepRepository {
    inner: Arc<InMemoryChatMessageRepository>,
}

#[async_trait]
impl ChatMessageRepository for FailingSweepRepository {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        self.inner.save(message).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.inner.recent(limit).await
    }

    async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Database("delete refused".to_string()))
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub repository: Arc<InMemoryChatMessageRepository>,
    pub clock: Arc<TestClock>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(HubSettings::default()).await
    }

    pub async fn start_with(settings: HubSettings) -> Self {
        Self::start_inner(settings, false).await
    }

    /// Server whose store rejects every retention delete
    pub async fn start_with_failing_sweep() -> Self {
        Self::start_inner(HubSettings::default(), true).await
    }

    async fn start_inner(settings: HubSettings, failing_sweep: bool) -> Self {
        let clock = Arc::new(TestClock::default());
        let repository = Arc::new(InMemoryChatMessageRepository::new(clock.clone()));
        let store: Arc<dyn ChatMessageRepository> = if failing_sweep {
            Arc::new(FailingSweepRepository {
                inner: repository.clone(),
            })
        } else {
            repository.clone()
        };
        let state = Arc::new(AppState::new(
            store,
            Arc::new(JwtCredentialVerifier::new(SECRET)),
            clock.clone(),
            settings,
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, state.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            state,
            repository,
            clock,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/chat/ws", self.addr)
    }

    /// Open a WebSocket connection (the handshake itself always succeeds,
    /// even when admission refuses the session).
    pub async fn connect(&self) -> WsClient {
        let (ws, _) = connect_async(self.ws_url())
            .await
            .expect("Failed to connect WebSocket");
        ws
    }

    /// Wait until the hub has exactly `count` members.
    pub async fn wait_for_members(&self, count: usize) {
        let hub = self.state.hub.clone();
        wait_until(|| {
            let hub = hub.clone();
            async move { hub.members().await.map(|m| m.len()).unwrap_or(0) == count }
        })
        .await;
    }

    /// Wait until the admission gate holds exactly `count` slots.
    pub async fn wait_for_live(&self, count: usize) {
        let state = self.state.clone();
        wait_until(|| {
            let state = state.clone();
            async move { state.admission.live() == count }
        })
        .await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + PATIENCE;
    while !condition().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within {:?}",
            PATIENCE
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Issue an HS256 token the server accepts
pub fn issue_token(user_id: i64, username: &str) -> String {
    let claims = JwtClaims {
        user_id,
        username: username.to_string(),
        exp: Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .expect("Failed to encode token")
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Next text frame as JSON, skipping control frames
pub async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(PATIENCE, ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Next close frame, skipping control frames
pub async fn next_close(ws: &mut WsClient) -> Option<CloseFrame> {
    loop {
        let msg = tokio::time::timeout(PATIENCE, ws.next())
            .await
            .expect("Timed out waiting for close")
            .expect("Connection ended without close frame")
            .expect("WebSocket error");
        match msg {
            Message::Close(frame) => return frame,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// True when nothing but control frames arrives within `window`
pub async fn stays_silent(ws: &mut WsClient, window: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return true,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(_) => return false,
        }
    }
}
