//! UseCase: WebSocket で受信したフレームの処理
//!
//! フレームごとに埋め込まれたトークンを検証する（接続時ではなくメッセージ
//! ごとの認証）。処理順:
//!
//! 1. JSON を解釈する（失敗はログのみ、応答なし）
//! 2. トークンを検証する
//! 3. 本文を検証して永続化し、ブロードキャストする
//!
//! どの失敗もセッションを終了させない。

use std::sync::Arc;

use crate::{
    domain::{ChatMessage, CredentialVerifier},
    infrastructure::dto::websocket::InboundFrame,
};

use super::{error::FrameError, send_message::SendMessageUseCase};

/// フレーム処理のユースケース
#[derive(Clone)]
pub struct ReceiveFrameUseCase {
    verifier: Arc<dyn CredentialVerifier>,
    send_message: SendMessageUseCase,
}

impl ReceiveFrameUseCase {
    /// 新しい ReceiveFrameUseCase を作成
    pub fn new(verifier: Arc<dyn CredentialVerifier>, send_message: SendMessageUseCase) -> Self {
        Self {
            verifier,
            send_message,
        }
    }

    /// 受信したテキストフレームを処理する
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 永続化され、Hub に渡されたメッセージ
    /// * `Err(FrameError)` - 送信元にだけ返すべきエラー
    pub async fn execute(&self, raw: &str) -> Result<ChatMessage, FrameError> {
        let frame: InboundFrame =
            serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))?;

        let author = self.verifier.verify(&frame.token)?;

        Ok(self.send_message.execute(author, frame.text).await?)
    }
}
