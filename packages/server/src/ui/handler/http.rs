//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::{
        ChatMessageDto,
        http::{HealthResponse, HistoryQuery, SendMessageRequest},
    },
    ui::{error::ApiError, extractor::AuthenticatedAuthor, state::AppState},
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let live_sessions = state.hub.members().await.map(|m| m.len()).unwrap_or(0);
    Json(HealthResponse {
        status: "ok".to_string(),
        live_sessions,
    })
}

/// Recent chat messages, newest first. Prunes expired messages first.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessageDto>>, ApiError> {
    let messages = state.get_messages.execute(query.effective_limit()).await?;
    Ok(Json(messages.iter().map(ChatMessageDto::from).collect()))
}

/// Post a message as the bearer of the request's token and broadcast it.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatMessageDto>), ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let message = state.send_message.execute(author, request.text).await?;
    tracing::info!(message_id = %message.id, author = %message.author.username, "message posted over HTTP");
    Ok((StatusCode::CREATED, Json(ChatMessageDto::from(&message))))
}
