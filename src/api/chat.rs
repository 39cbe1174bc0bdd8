use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    Json,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::api::middleware::{AuthUser, Identity};
use crate::api::state::AppState;
use crate::chat::service::DEFAULT_HISTORY_LIMIT;
use crate::chat::{Frame, Hub, Outbound};
use crate::db::models::Message;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct GetMessagesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_HISTORY_LIMIT
}

/// GET /api/chat/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Query(query): Query<GetMessagesQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state.chat.get_messages(query.limit).await?;
    tracing::debug!(?user_id, count = messages.len(), "served chat history");
    Ok(Json(messages))
}

/// GET /ws/chat (requires auth)
pub async fn chat_socket(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state.hub))
}

/// Write half of an upgraded socket. Reads stay with the connection's own task.
struct SocketOutbound {
    sink: Mutex<SplitSink<WebSocket, WsMessage>>,
}

#[async_trait]
impl Outbound for SocketOutbound {
    async fn send(&self, text: &str) -> Result<(), AppError> {
        self.sink
            .lock()
            .await
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| AppError::Transport(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.sink.lock().await.close().await;
    }
}

/// Per-connection loop: register, read frames until the peer goes away, unregister.
async fn handle_socket(socket: WebSocket, user_id: i64, hub: Arc<Hub>) {
    let (sink, mut stream) = socket.split();
    let outbound = Arc::new(SocketOutbound { sink: Mutex::new(sink) });
    let connection = hub.register(user_id, outbound).await;

    while let Some(received) = stream.next().await {
        match received {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<Frame>(text.as_str()) {
                Ok(frame) => {
                    if !hub.handle_frame(connection, frame).await {
                        break;
                    }
                }
                Err(err) => tracing::debug!(%connection, error = %err, "skipping undecodable frame"),
            },
            Ok(WsMessage::Close(frame)) => {
                log_close(connection, frame.as_ref());
                break;
            }
            // Pings are answered by axum; binary frames carry nothing we handle.
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%connection, error = %err, "websocket error");
                break;
            }
        }
    }

    hub.unregister(connection).await;
}

fn log_close(connection: crate::chat::ConnectionId, frame: Option<&CloseFrame>) {
    match frame {
        None => tracing::debug!(%connection, "peer closed connection"),
        Some(frame) if frame.code == close_code::NORMAL || frame.code == close_code::AWAY => {
            tracing::debug!(%connection, code = frame.code, "peer closed connection");
        }
        Some(frame) => {
            tracing::warn!(%connection, code = frame.code, reason = %frame.reason.as_str(), "unexpected close");
        }
    }
}
