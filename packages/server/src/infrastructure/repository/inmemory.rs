//! InMemory ChatMessage Repository 実装
//!
//! Vec をインメモリ DB として使用します。データベース URL が設定されて
//! いない場合の既定のストアで、テストでも使用します。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, ChatMessageRepository, Clock, MessageId, NewChatMessage, RepositoryError,
};

#[derive(Default)]
struct Store {
    /// 作成順（古い順）
    messages: Vec<ChatMessage>,
    last_id: i64,
}

/// インメモリ ChatMessage Repository 実装
pub struct InMemoryChatMessageRepository {
    store: Mutex<Store>,
    clock: Arc<dyn Clock>,
}

impl InMemoryChatMessageRepository {
    /// 新しい InMemoryChatMessageRepository を作成
    ///
    /// # Arguments
    ///
    /// * `clock` - 保存時の作成時刻を決める時計
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            clock,
        }
    }

    /// 保存済みメッセージ数
    pub async fn len(&self) -> usize {
        self.store.lock().await.messages.len()
    }

    /// 保存済みメッセージがないかどうか
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ChatMessageRepository for InMemoryChatMessageRepository {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut store = self.store.lock().await;
        store.last_id += 1;
        let saved = ChatMessage::persisted(message, MessageId::new(store.last_id), self.clock.now());
        store.messages.push(saved.clone());
        Ok(saved)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, RepositoryError> {
        let store = self.store.lock().await;
        let mut messages: Vec<ChatMessage> =
            store.messages.iter().rev().take(limit).cloned().collect();
        // 同時刻の場合は ID の降順
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut store = self.store.lock().await;
        let before = store.messages.len();
        store.messages.retain(|m| !m.is_older_than(cutoff));
        Ok((before - store.messages.len()) as u64)
    }
}
