//! PostgreSQL ChatMessage Repository 実装

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use crate::domain::{
    Author, ChatMessage, ChatMessageRepository, MessageId, MessageText, NewChatMessage,
    RepositoryError, UserId, Username,
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chat_messages (
    id         BIGSERIAL PRIMARY KEY,
    user_id    BIGINT      NOT NULL,
    author     TEXT        NOT NULL,
    text       TEXT        NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS chat_messages_created_at_idx ON chat_messages (created_at)";

/// データベースの行
#[derive(Debug, Clone, FromRow)]
struct ChatMessageRow {
    id: i64,
    user_id: i64,
    author: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = RepositoryError;

    fn try_from(row: ChatMessageRow) -> Result<Self, Self::Error> {
        let corrupted = |e: crate::domain::ValueObjectError| {
            RepositoryError::Corrupted(format!("chat_messages.id={}: {}", row.id, e))
        };
        let username = Username::new(row.author.clone()).map_err(corrupted)?;
        let text = MessageText::new(row.text.clone()).map_err(corrupted)?;
        Ok(ChatMessage::persisted(
            NewChatMessage::new(Author::new(UserId::new(row.user_id), username), text),
            MessageId::new(row.id),
            row.created_at,
        ))
    }
}

fn database_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// PostgreSQL ChatMessage Repository 実装
///
/// コネクションプールはすべてのセッションとスイーパーで共有される。
#[derive(Clone)]
pub struct PostgresChatMessageRepository {
    pool: PgPool,
}

impl PostgresChatMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// データベースに接続する
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// `chat_messages` テーブルとインデックスがなければ作成する
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatMessageRepository for PostgresChatMessageRepository {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"INSERT INTO chat_messages (user_id, author, text, created_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING id, created_at"#,
        )
        .bind(message.author.user_id.value())
        .bind(message.author.username.as_str())
        .bind(message.text.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(ChatMessage::persisted(message, MessageId::new(id), created_at))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"SELECT id, user_id, author, text, created_at
               FROM chat_messages
               ORDER BY created_at DESC, id DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected())
    }
}
