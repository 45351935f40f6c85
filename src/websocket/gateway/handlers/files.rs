//! File browsing and editing handlers.

use codedeck_core::files;

use super::super::dispatch::ConnContext;
use crate::websocket::protocol::ServerMessage;

pub(crate) async fn fetch_dir(ctx: &ConnContext, dir: String) -> ServerMessage {
    let target = files::join_relative(&ctx.scratch_dir, &dir);
    match files::list_dir(&target, &dir).await {
        Ok(entries) => ServerMessage::Dir { dir, entries },
        Err(error) => ServerMessage::from_error(&error),
    }
}

pub(crate) async fn fetch_content(ctx: &ConnContext, path: String) -> ServerMessage {
    let target = files::join_relative(&ctx.scratch_dir, &path);
    match files::read_file(&target).await {
        Ok(content) => ServerMessage::Content { path, content },
        Err(error) => ServerMessage::from_error(&error),
    }
}

/// Local write first, then remote push. The local copy may change even when
/// the push fails; the error frame tells the client the edit is not durably
/// saved.
pub(crate) async fn update_content(
    ctx: &ConnContext,
    path: String,
    content: String,
) -> ServerMessage {
    let target = files::join_relative(&ctx.scratch_dir, &path);
    if let Err(error) = files::write_file(&target, content.as_bytes()).await {
        return ServerMessage::from_error(&error);
    }
    match ctx
        .sync
        .push(&ctx.workspace_id, &path, content.as_bytes())
        .await
    {
        Ok(()) => ServerMessage::Saved { path },
        Err(error) => ServerMessage::from_error(&error),
    }
}
