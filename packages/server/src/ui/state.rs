//! Server state shared by every handler.

use std::{sync::Arc, time::Duration};

use crate::{
    config::ServerConfig,
    domain::{ChatMessageRepository, Clock, CredentialVerifier},
    hub::{AdmissionGate, DEFAULT_OUTBOUND_CAPACITY, Hub},
    usecase::{
        GetMessagesUseCase, ReceiveFrameUseCase, RetentionSweeper, SendMessageUseCase,
        retention::{DEFAULT_RETENTION, DEFAULT_SWEEP_INTERVAL},
    },
};

/// Tunables of the chat hub
#[derive(Debug, Clone)]
pub struct HubSettings {
    pub max_connections: usize,
    pub outbound_capacity: usize,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub idle_timeout: Duration,
    pub ping_interval: Duration,
    pub write_timeout: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            max_connections: 100,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            retention: DEFAULT_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_timeout: Duration::from_secs(600),
            ping_interval: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ServerConfig> for HubSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            outbound_capacity: config.outbound_capacity,
            retention: config.retention(),
            sweep_interval: config.sweep_interval(),
            idle_timeout: config.idle_timeout(),
            ping_interval: config.ping_interval(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Broadcast hub（セッションの登録とブロードキャスト）
    pub hub: Hub,
    /// Connection admission gate
    pub admission: Arc<AdmissionGate>,
    /// Retention sweeper, also run on session start
    pub sweeper: Arc<RetentionSweeper>,
    /// Verifies bearer tokens on the HTTP surface
    pub verifier: Arc<dyn CredentialVerifier>,
    pub send_message: SendMessageUseCase,
    pub get_messages: GetMessagesUseCase,
    pub receive_frame: ReceiveFrameUseCase,
    pub settings: HubSettings,
}

impl AppState {
    /// Wire the hub and use cases together. Starts the hub loop, so it must
    /// run inside a tokio runtime.
    pub fn new(
        repository: Arc<dyn ChatMessageRepository>,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
        settings: HubSettings,
    ) -> Self {
        let hub = Hub::spawn(settings.outbound_capacity);
        let admission = AdmissionGate::new(settings.max_connections);
        let sweeper = Arc::new(RetentionSweeper::new(
            repository.clone(),
            clock,
            settings.retention,
        ));
        let send_message = SendMessageUseCase::new(repository.clone(), hub.clone());
        let get_messages = GetMessagesUseCase::new(repository, sweeper.clone());
        let receive_frame = ReceiveFrameUseCase::new(verifier.clone(), send_message.clone());

        Self {
            hub,
            admission,
            sweeper,
            verifier,
            send_message,
            get_messages,
            receive_frame,
            settings,
        }
    }
}
