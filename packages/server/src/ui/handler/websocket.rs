//! WebSocket connection handlers.
//!
//! Each admitted connection becomes a client session with two tasks: a
//! reader that handles inbound frames one at a time, and a writer that owns
//! the socket sink and drains the session's outbound queue plus its private
//! reply queue. The writer also pings the peer on a fixed period; the pong
//! counts as inbound traffic, so a client that only listens is not closed by
//! the reader's idle timeout. The admission permit lives as long as the
//! session.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    hub::{AdmissionPermit, OutboundReceiver, SessionId},
    infrastructure::dto::websocket::OutboundFrame,
    ui::state::AppState,
    usecase::ReceiveFrameUseCase,
};

/// Close reason sent to peers refused by the admission gate
pub const TOO_MANY_CONNECTIONS: &str = "too many connections";

/// Capacity of the per-session queue carrying error replies to the sender
const REPLY_QUEUE_CAPACITY: usize = 16;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.admission.try_admit() {
        Some(permit) => ws.on_upgrade(move |socket| handle_socket(socket, state, permit)),
        None => {
            tracing::warn!(
                max_connections = state.admission.max(),
                "too many connections, rejecting"
            );
            ws.on_upgrade(reject_socket)
        }
    }
}

/// Tell a refused peer why, then drop the connection.
async fn reject_socket(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: close_code::AGAIN,
        reason: Utf8Bytes::from_static(TOO_MANY_CONNECTIONS),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!("failed to send rejection close frame: {}", e);
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, permit: AdmissionPermit) {
    // Released when this function returns, whatever the exit path.
    let _permit = permit;

    let (session_id, outbound) = match state.hub.open_session() {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("cannot open session: {}", e);
            return;
        }
    };
    tracing::info!(
        session = %session_id,
        live = state.admission.live(),
        "session started"
    );

    if let Err(e) = state.sweeper.sweep().await {
        tracing::warn!(session = %session_id, "retention sweep on session start failed: {}", e);
    }

    let (sink, stream) = socket.split();
    let (reply_tx, reply_rx) = mpsc::channel(REPLY_QUEUE_CAPACITY);
    let idle_timeout = state.settings.idle_timeout;
    let write_timeout = state.settings.write_timeout;
    let ping_interval = state.settings.ping_interval;

    let mut send_task = tokio::spawn(write_loop(
        sink,
        outbound,
        reply_rx,
        session_id,
        write_timeout,
        ping_interval,
    ));
    let mut recv_task = tokio::spawn(read_loop(
        stream,
        state.receive_frame.clone(),
        reply_tx,
        session_id,
        idle_timeout,
    ));

    tokio::select! {
        _ = &mut recv_task => {
            // The writer drains what is queued, sends a close frame and exits.
            state.hub.unregister(session_id);
            if tokio::time::timeout(write_timeout, &mut send_task).await.is_err() {
                tracing::debug!(session = %session_id, "writer did not finish in time");
                send_task.abort();
            }
        }
        _ = &mut send_task => {
            // Evicted or the socket stopped accepting writes.
            recv_task.abort();
            state.hub.unregister(session_id);
        }
    }

    tracing::info!(session = %session_id, "session ended");
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    receive_frame: ReceiveFrameUseCase,
    replies: mpsc::Sender<OutboundFrame>,
    session_id: SessionId,
    idle_timeout: Duration,
) {
    loop {
        let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::info!(session = %session_id, "idle timeout");
                break;
            }
        };
        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::warn!(session = %session_id, "WebSocket error: {}", e);
                break;
            }
            None => break,
        };

        match msg {
            Message::Text(text) => match receive_frame.execute(text.as_str()).await {
                Ok(message) => {
                    tracing::debug!(
                        session = %session_id,
                        message_id = %message.id,
                        author = %message.author.username,
                        "message accepted"
                    );
                }
                Err(e) => {
                    tracing::warn!(session = %session_id, "frame rejected: {}", e);
                    let Some(reply) = e.client_message() else {
                        continue;
                    };
                    match replies.try_send(OutboundFrame::error(reply)) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            tracing::warn!(session = %session_id, "reply queue full, error reply dropped");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            },
            Message::Binary(_) => {
                tracing::warn!(session = %session_id, "binary frame ignored");
            }
            Message::Close(_) => {
                tracing::info!(session = %session_id, "client requested close");
                break;
            }
            // Pings are answered by the protocol layer. Either kind resets the
            // idle deadline.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: OutboundReceiver,
    mut replies: mpsc::Receiver<OutboundFrame>,
    session_id: SessionId,
    write_timeout: Duration,
    ping_interval: Duration,
) {
    let mut heartbeat = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            biased;
            Some(reply) = replies.recv() => Some(reply),
            // Ahead of the outbound queue so a busy room cannot starve it.
            _ = heartbeat.tick() => None,
            message = outbound.recv() => match message {
                Some(message) => Some(OutboundFrame::from(message.as_ref())),
                None => break,
            },
        };

        let message = match frame {
            Some(frame) => match serde_json::to_string(&frame) {
                Ok(json) => Message::Text(json.into()),
                Err(e) => {
                    tracing::error!(session = %session_id, "failed to encode frame: {}", e);
                    continue;
                }
            },
            None => {
                tracing::trace!(session = %session_id, "heartbeat ping");
                Message::Ping(Bytes::new())
            }
        };
        match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(session = %session_id, "write failed: {}", e);
                return;
            }
            Err(_) => {
                tracing::info!(session = %session_id, "write timed out");
                return;
            }
        }
    }

    // Outbound queue closed by the hub.
    match tokio::time::timeout(write_timeout, sink.send(Message::Close(None))).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(session = %session_id, "close frame not sent: {}", e),
        Err(_) => tracing::debug!(session = %session_id, "close frame timed out"),
    }
}
