//! Typed message dispatch for the workspace gateway.

use std::path::PathBuf;
use std::sync::Arc;

use codedeck_core::{SessionRegistry, WorkspaceSync};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::handlers;
use crate::websocket::protocol::{ClientMessage, ServerMessage};

/// Everything a handler needs about the connection it serves.
pub(crate) struct ConnContext {
    pub conn_id: Uuid,
    pub workspace_id: String,
    pub scratch_dir: PathBuf,
    pub sync: Arc<WorkspaceSync>,
    pub registry: Arc<SessionRegistry>,
}

/// Route a client message to its handler. Returns the reply frame, or
/// `None` for messages that reply through the terminal stream (or not at
/// all) on success.
pub(crate) async fn dispatch(
    message: ClientMessage,
    ctx: &ConnContext,
    terminal_rx: &mut Option<UnboundedReceiver<Vec<u8>>>,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::FetchDir { dir } => Some(handlers::files::fetch_dir(ctx, dir).await),
        ClientMessage::FetchContent { path } => {
            Some(handlers::files::fetch_content(ctx, path).await)
        }
        ClientMessage::UpdateContent { path, content } => {
            Some(handlers::files::update_content(ctx, path, content).await)
        }
        ClientMessage::RequestTerminal {} => {
            handlers::terminal::request_terminal(ctx, terminal_rx).await
        }
        ClientMessage::TerminalData { data, .. } => {
            handlers::terminal::terminal_data(ctx, &data).await
        }
        ClientMessage::TerminalResize { rows, cols } => {
            handlers::terminal::terminal_resize(ctx, rows, cols).await
        }
    }
}
