//! Terminal session handlers.

use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::super::dispatch::ConnContext;
use crate::websocket::protocol::ServerMessage;

/// Start or replace the connection's shell session. Output flows through
/// the channel handed back via `terminal_rx`; there is no direct reply.
pub(crate) async fn request_terminal(
    ctx: &ConnContext,
    terminal_rx: &mut Option<UnboundedReceiver<Vec<u8>>>,
) -> Option<ServerMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    match ctx
        .registry
        .create(ctx.conn_id, &ctx.workspace_id, &ctx.scratch_dir, tx)
        .await
    {
        Ok(()) => {
            *terminal_rx = Some(rx);
            None
        }
        Err(error) => Some(ServerMessage::from_error(&error)),
    }
}

pub(crate) async fn terminal_data(ctx: &ConnContext, data: &str) -> Option<ServerMessage> {
    match ctx.registry.write(ctx.conn_id, data.as_bytes()).await {
        Ok(()) => None,
        Err(error) => Some(ServerMessage::from_error(&error)),
    }
}

pub(crate) async fn terminal_resize(
    ctx: &ConnContext,
    rows: u16,
    cols: u16,
) -> Option<ServerMessage> {
    match ctx.registry.resize(ctx.conn_id, rows, cols).await {
        Ok(()) => None,
        Err(error) => Some(ServerMessage::from_error(&error)),
    }
}
