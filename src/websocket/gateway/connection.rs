//! Per-connection lifecycle: bootstrap, message loop, teardown.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use base64::Engine;
use codedeck_core::{files, SessionRegistry, WorkspaceSync};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use uuid::Uuid;

use super::dispatch::{dispatch, ConnContext};
use crate::websocket::protocol::{ErrorCode, ServerMessage};

/// Main connection handler, spawned per upgraded socket.
pub(crate) async fn handle_connection(
    mut socket: WebSocket,
    workspace: Option<String>,
    sync: Arc<WorkspaceSync>,
    registry: Arc<SessionRegistry>,
) {
    let conn_id = Uuid::new_v4();

    // Fail fast on a missing workspace id: close, clear any stale entry,
    // allocate nothing else.
    let Some(workspace) = workspace.filter(|w| !w.is_empty()) else {
        warn!(%conn_id, "connection rejected: missing workspace parameter");
        registry.clear(conn_id).await;
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "missing workspace parameter".into(),
            })))
            .await;
        return;
    };

    info!(%conn_id, workspace = %workspace, "connection opened");
    run_connection(socket, conn_id, workspace, sync, Arc::clone(&registry)).await;

    // All exits converge here: explicit close, socket error, bootstrap
    // failure. Teardown is idempotent against the exit watcher.
    registry.clear(conn_id).await;
    info!(%conn_id, "connection closed");
}

async fn run_connection(
    socket: WebSocket,
    conn_id: Uuid,
    workspace: String,
    sync: Arc<WorkspaceSync>,
    registry: Arc<SessionRegistry>,
) {
    // Bootstrap. A disconnect during the pull does not cancel it: the pull
    // finishes populating the scratch dir for a future reconnect, and the
    // dead socket is only noticed afterwards.
    let scratch = match sync.pull(&workspace).await {
        Ok(scratch) => scratch,
        Err(error) => {
            warn!(%conn_id, workspace = %workspace, %error, "workspace pull failed");
            return;
        }
    };
    let root_content = match files::list_dir(&scratch, "").await {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%conn_id, workspace = %workspace, %error, "failed to list workspace root");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    if send(&mut ws_tx, &ServerMessage::Loaded { root_content })
        .await
        .is_err()
    {
        return;
    }

    let ctx = ConnContext {
        conn_id,
        workspace_id: workspace,
        scratch_dir: scratch,
        sync,
        registry,
    };

    // Output channel of this connection's shell session; set once
    // `requestTerminal` succeeds.
    let mut terminal_rx: Option<UnboundedReceiver<Vec<u8>>> = None;

    loop {
        tokio::select! {
            // Client message
            message = ws_rx.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str(&text) {
                            Ok(client_message) => {
                                dispatch(client_message, &ctx, &mut terminal_rx).await
                            }
                            Err(error) => Some(ServerMessage::Error {
                                code: ErrorCode::InvalidParams,
                                message: format!("unrecognized message: {}", error),
                            }),
                        };
                        if let Some(reply) = reply {
                            if send(&mut ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => {
                        warn!(%conn_id, %error, "websocket error");
                        break;
                    }
                    // Ping/pong handled by axum; binary frames ignored.
                    Some(Ok(_)) => {}
                }
            }
            // Shell output → client
            chunk = next_terminal_chunk(&mut terminal_rx) => {
                match chunk {
                    Some(data) => {
                        let frame = ServerMessage::Terminal {
                            data: base64::engine::general_purpose::STANDARD.encode(data),
                        };
                        if send(&mut ws_tx, &frame).await.is_err() {
                            break;
                        }
                    }
                    // Pump ended: process exited or session was replaced.
                    None => terminal_rx = None,
                }
            }
        }
    }
}

/// Resolves to the next output chunk, or pends forever while no session is
/// attached so the select arm stays parked.
async fn next_terminal_chunk(rx: &mut Option<UnboundedReceiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).unwrap_or_default();
    ws_tx.send(Message::Text(json)).await
}
