//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AuthError, RepositoryError, ValueObjectError};

/// メッセージ送信のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// 本文が空、または長すぎる
    #[error(transparent)]
    InvalidText(#[from] ValueObjectError),

    /// 永続化に失敗した
    #[error("failed to save message: {0}")]
    SaveFailed(#[source] RepositoryError),
}

/// 履歴取得のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GetMessagesError {
    /// 取得前の保持期間スイープに失敗した
    #[error("failed to prune old messages: {0}")]
    Sweep(#[source] RepositoryError),

    /// 読み出しに失敗した
    #[error("failed to read messages: {0}")]
    Read(#[source] RepositoryError),
}

/// WebSocket で受信した 1 フレームの処理エラー
///
/// どれもセッションを終了させない。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// JSON として解釈できない、または形が違う
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// トークン検証に失敗した
    #[error("invalid token")]
    InvalidToken(#[from] AuthError),

    /// 本文の検証に失敗した
    #[error(transparent)]
    InvalidText(ValueObjectError),

    /// 永続化に失敗した
    #[error("failed to save message: {0}")]
    SaveFailed(#[source] RepositoryError),
}

impl FrameError {
    /// 送信元クライアントへ返すエラー文言
    ///
    /// 不正なフレームはログに残すだけで、クライアントには何も返さない。
    pub fn client_message(&self) -> Option<&'static str> {
        match self {
            Self::Malformed(_) => None,
            Self::InvalidToken(_) => Some("invalid token"),
            Self::InvalidText(ValueObjectError::MessageTextTooLong { .. }) => {
                Some("message too long")
            }
            Self::InvalidText(_) => Some("message cannot be empty"),
            Self::SaveFailed(_) => Some("failed to save message"),
        }
    }
}

impl From<SendMessageError> for FrameError {
    fn from(error: SendMessageError) -> Self {
        match error {
            SendMessageError::InvalidText(e) => Self::InvalidText(e),
            SendMessageError::SaveFailed(e) => Self::SaveFailed(e),
        }
    }
}
