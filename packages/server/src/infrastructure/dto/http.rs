//! HTTP API request and response DTOs for the chat hub.

use serde::{Deserialize, Serialize};

/// Default number of messages returned by the history endpoint
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Upper bound on the history endpoint's `limit`
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Body of `POST /chat/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Query of `GET /chat/messages`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    /// Requested limit clamped to `1..=MAX_HISTORY_LIMIT`
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub live_sessions: usize,
}
