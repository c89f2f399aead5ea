// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket handshake and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::GatewayError;
use crate::gateway::{ClientEvent, ServerEvent, Session};
use crate::state::AppState;
use crate::transport::auth;

/// How long a closing connection may spend flushing its outbox.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler. The credential is checked before upgrading;
/// a missing or invalid one gets a 401 and never reaches the event loop.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let (tx, rx) = mpsc::channel(state.config.outbox_capacity.max(1));
    let mut session = Session::new(tx);
    let conn = session.conn();
    let credential = auth::credential_from(&headers, query.token.as_deref());
    if let Err(e) = session.authenticate(&state.auth, credential) {
        tracing::info!(%conn, "websocket handshake refused: {}", e.message);
        return e.into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |socket| handle_connection(state, session, rx, socket)).into_response()
}

/// Per-connection event loop.
///
/// A writer task drains the outbox into the socket while this task reads
/// client events and dispatches them. Whichever side stops first ends the
/// connection; membership is released before the writer is reaped.
async fn handle_connection(
    state: Arc<AppState>,
    mut session: Session,
    mut outbox: mpsc::Receiver<ServerEvent>,
    socket: WebSocket,
) {
    state.connection_opened();
    let conn = session.conn();
    let user = session.identity().map(|i| i.username.clone()).unwrap_or_default();
    tracing::info!(%conn, user = %user, "connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            if send_json(&mut ws_tx, &event).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });
    let mut writer_done = false;

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            _ = &mut writer => {
                writer_done = true;
                break;
            }
            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(_)) | None => break,
                };

                match msg {
                    Message::Text(text) => {
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(e) => e,
                            Err(_) => {
                                let err = GatewayError::validation("invalid message");
                                if !session.reply(ServerEvent::error(&err)).await {
                                    break;
                                }
                                continue;
                            }
                        };
                        if !session.dispatch(&state, event).await {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    // Cleanup
    session.close(&state);
    drop(session);
    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    state.connection_closed();
    tracing::info!(%conn, user = %user, "connection closed");
}

/// Send a JSON-serialized event over the WebSocket.
async fn send_json<S>(tx: &mut S, event: &ServerEvent) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(t) => t,
        Err(_) => return Err(()),
    };
    tx.send(Message::Text(text.into())).await.map_err(|_| ())
}
