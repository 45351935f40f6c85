//! Workspace websocket gateway.
//!
//! One websocket per client, keyed by a required `workspace` query
//! parameter.
//!
//! Flow:
//! 1. Client connects to `/ws?workspace=<id>`; a missing id closes the
//!    socket immediately, nothing allocated
//! 2. Bootstrap: pull the workspace from storage, list the scratch root,
//!    emit `loaded`
//! 3. Only then does the message loop start serving file and terminal
//!    messages
//! 4. Disconnect tears the connection's session down unconditionally

mod connection;
mod dispatch;
mod handlers;

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use codedeck_core::{SessionRegistry, WorkspaceSync};
use serde::Deserialize;

use connection::handle_connection;

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    workspace: Option<String>,
}

/// Websocket upgrade handler for `/ws`.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    Extension(sync): Extension<Arc<WorkspaceSync>>,
    Extension(registry): Extension<Arc<SessionRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, query.workspace, sync, registry))
}

/// Create the websocket route.
pub fn routes() -> Router {
    Router::new().route("/ws", get(ws_handler))
}
