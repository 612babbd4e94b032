//! WebSocket upgrade handler.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use sparkup_core::error::AppError;
use sparkup_core::types::UserId;

use crate::state::AppState;

/// Connection query parameters.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Claimed user id. Taken on trust.
    pub user_id: Option<String>,
    /// Client device key; a reconnect from the same device replaces the
    /// previous connection.
    pub device: Option<String>,
}

impl WsQuery {
    fn user_id(&self) -> Result<UserId, AppError> {
        let raw = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("user_id is required"))?;
        raw.parse::<UserId>()
            .map_err(|_| AppError::validation("user_id must be an integer"))
    }
}

/// GET /ws?user_id={id}&device={key}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user_id = match query.user_id() {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e.message, "Connection attempt without valid user_id");
            return e.into_response();
        }
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(state, user_id, query.device, socket))
}

/// Runs one established connection until either side closes it or the
/// registry evicts it.
async fn handle_socket(state: AppState, user_id: UserId, device: Option<String>, socket: WebSocket) {
    let (handle, mut outbound_rx) = state.realtime.connections.register(user_id, device).await;
    let conn_id = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_closed = closed(handle.closed_signal());
    let writer = tokio::spawn(async move {
        tokio::pin!(writer_closed);
        loop {
            tokio::select! {
                frame = outbound_rx.recv() => match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut writer_closed => break,
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    let reader_closed = closed(handle.closed_signal());
    tokio::pin!(reader_closed);
    loop {
        tokio::select! {
            next = ws_rx.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    state.realtime.dispatcher.handle_frame(&handle, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut reader_closed => {
                debug!(conn_id = %conn_id, "Connection replaced, closing socket");
                break;
            }
        }
    }

    state.realtime.connections.unregister(&conn_id).await;
    handle.close();
    let _ = writer.await;

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}

/// Resolves once the handle is closed, including when it already was.
async fn closed(mut signal: watch::Receiver<bool>) {
    let _ = signal.wait_for(|closed| *closed).await;
}
