//! Repository trait definitions.
//!
//! The domain layer declares the persistence port; infrastructure supplies
//! the implementations (dependency inversion).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ChatMessage, NewChatMessage, RepositoryError};

/// Durable storage for chat messages.
///
/// Every call is a single independent statement; no operation spans another.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Store a message, assigning its identifier and creation time.
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError>;

    /// Return at most `limit` messages, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// Delete every message created strictly before `cutoff`.
    ///
    /// Returns the number of deleted messages.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
