//! UseCase: メッセージ履歴の取得
//!
//! 読み出しの前に保持期間スイープを実行する。スイープに失敗した場合は
//! 読み出さずにエラーを返す。

use std::sync::Arc;

use crate::domain::{ChatMessage, ChatMessageRepository};

use super::{error::GetMessagesError, retention::RetentionSweeper};

/// 履歴取得のユースケース
#[derive(Clone)]
pub struct GetMessagesUseCase {
    repository: Arc<dyn ChatMessageRepository>,
    sweeper: Arc<RetentionSweeper>,
}

impl GetMessagesUseCase {
    /// 新しい GetMessagesUseCase を作成
    pub fn new(repository: Arc<dyn ChatMessageRepository>, sweeper: Arc<RetentionSweeper>) -> Self {
        Self {
            repository,
            sweeper,
        }
    }

    /// 新しい順に最大 `limit` 件のメッセージを返す
    pub async fn execute(&self, limit: usize) -> Result<Vec<ChatMessage>, GetMessagesError> {
        self.sweeper.sweep().await.map_err(GetMessagesError::Sweep)?;
        self.repository
            .recent(limit)
            .await
            .map_err(GetMessagesError::Read)
    }
}
