//! Server startup: wiring, routing and serving.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler,
    signal::shutdown_signal,
    state::{AppState, HubSettings},
};
use crate::{
    config::{ConfigError, ServerConfig},
    domain::{ChatMessageRepository, SystemClock},
    infrastructure::{
        auth::JwtCredentialVerifier,
        repository::{InMemoryChatMessageRepository, PostgresChatMessageRepository},
    },
};

/// Errors that stop the server from starting or serving
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handler::health_check))
        .route(
            "/chat/messages",
            get(handler::get_messages).post(handler::send_message),
        )
        .route("/chat/ws", get(handler::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Starts the periodic retention sweep for the lifetime of the server.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweep_task = state
        .sweeper
        .clone()
        .spawn_periodic(state.settings.sweep_interval);
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await;
    sweep_task.abort();
    result
}

/// Run the server with the given configuration until a shutdown signal.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    let clock = Arc::new(SystemClock);
    let repository: Arc<dyn ChatMessageRepository> = match &config.database_url {
        Some(url) => {
            let repository =
                PostgresChatMessageRepository::connect(url, config.database_pool_size).await?;
            if config.run_migrations {
                repository.ensure_schema().await?;
                tracing::info!("chat_messages schema ensured");
            }
            tracing::info!("using PostgreSQL message store");
            Arc::new(repository)
        }
        None => {
            tracing::info!("no database configured, using in-memory message store");
            Arc::new(InMemoryChatMessageRepository::new(clock.clone()))
        }
    };
    let verifier = Arc::new(JwtCredentialVerifier::new(config.jwt_secret.as_bytes()));

    let settings = HubSettings::from(&config);
    let state = Arc::new(AppState::new(repository, verifier, clock, settings));

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        "listening on {} (max connections: {}, retention: {} min)",
        listener.local_addr()?,
        config.max_connections,
        config.retention_minutes
    );

    serve(listener, state, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}
