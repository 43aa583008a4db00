//! UseCase 層
//!
//! チャットハブのアプリケーションロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層のポートと Hub を操作します。

pub mod error;
pub mod get_messages;
pub mod receive_frame;
pub mod retention;
pub mod send_message;

pub use error::{FrameError, GetMessagesError, SendMessageError};
pub use get_messages::GetMessagesUseCase;
pub use receive_frame::ReceiveFrameUseCase;
pub use retention::RetentionSweeper;
pub use send_message::SendMessageUseCase;
