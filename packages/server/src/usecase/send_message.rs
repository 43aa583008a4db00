//! UseCase: メッセージ送信処理
//!
//! 検証済みの作成者とメッセージ本文を受け取り、永続化してから Hub に
//! ブロードキャストを依頼する。WebSocket 経由（フレーム内トークンで認証）と
//! HTTP 経由（Bearer トークンで認証）の両方から呼び出される。

use std::sync::Arc;

use crate::{
    domain::{Author, ChatMessage, ChatMessageRepository, MessageText, NewChatMessage},
    hub::Hub,
};

use super::error::SendMessageError;

/// メッセージ送信のユースケース
#[derive(Clone)]
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatMessageRepository>,
    /// ブロードキャスト先
    hub: Hub,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(repository: Arc<dyn ChatMessageRepository>, hub: Hub) -> Self {
        Self { repository, hub }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `author` - 検証済みの作成者
    /// * `text` - 受信したままのメッセージ本文
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 永続化されたメッセージ（ID と作成時刻つき）
    /// * `Err(SendMessageError)` - 検証または永続化の失敗。この場合ブロードキャストはしない
    pub async fn execute(
        &self,
        author: Author,
        text: String,
    ) -> Result<ChatMessage, SendMessageError> {
        // 1. 本文を検証
        let text = MessageText::new(text)?;

        // 2. 永続化（ID と作成時刻はここで確定する）
        let message = self
            .repository
            .save(NewChatMessage::new(author, text))
            .await
            .map_err(SendMessageError::SaveFailed)?;

        // 3. Hub にブロードキャストを依頼
        if let Err(e) = self.hub.publish(message.clone()).await {
            tracing::warn!(message_id = %message.id, "message saved but not broadcast: {}", e);
        }

        Ok(message)
    }
}
