//! Workspace websocket wire protocol.
//!
//! Every message on the socket is one of a closed set of tagged variants;
//! there is no dynamic event registration. Terminal output bytes travel
//! base64-encoded inside JSON text frames; terminal input arrives as plain
//! text, mirroring how browser terminal clients emit keystrokes.

use codedeck_core::{Error, FileEntry};
use serde::{Deserialize, Serialize};

/// Client → Server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// List one directory level of the workspace.
    FetchDir {
        #[serde(default)]
        dir: String,
    },
    /// Read a file's contents.
    FetchContent { path: String },
    /// Write a file locally, then push it to remote storage.
    UpdateContent { path: String, content: String },
    /// Start (or replace) this connection's shell session.
    RequestTerminal {},
    /// Keystrokes for the shell. `terminal_id` is accepted for wire
    /// compatibility but unused: there is one session per connection.
    #[serde(rename_all = "camelCase")]
    TerminalData {
        data: String,
        #[serde(default)]
        #[allow(dead_code)]
        terminal_id: Option<u32>,
    },
    /// Resize the shell's pty.
    TerminalResize { rows: u16, cols: u16 },
}

/// Server → Client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Bootstrap finished; carries the workspace root listing. Always the
    /// first message on a successful connection.
    #[serde(rename_all = "camelCase")]
    Loaded { root_content: Vec<FileEntry> },
    /// Reply to `fetchDir`.
    Dir { dir: String, entries: Vec<FileEntry> },
    /// Reply to `fetchContent`.
    Content { path: String, content: String },
    /// Reply to `updateContent`: both the local write and the remote push
    /// succeeded.
    Saved { path: String },
    /// Shell output chunk, base64-encoded.
    Terminal { data: String },
    /// Request-level failure.
    Error { code: ErrorCode, message: String },
}

/// Error codes carried by [`ServerMessage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing parameters.
    InvalidParams,
    /// No session (or file) matching the request.
    NotFound,
    /// Local filesystem failure.
    IoError,
    /// Remote storage failure.
    StorageError,
    /// Shell spawn or pty failure.
    ProcessError,
}

impl ServerMessage {
    /// Map an engine error onto a protocol error frame.
    pub fn from_error(error: &Error) -> Self {
        let code = match error {
            Error::Validation(_) => ErrorCode::InvalidParams,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::Io(_) => ErrorCode::IoError,
            Error::Storage(_) => ErrorCode::StorageError,
            Error::Process(_) => ErrorCode::ProcessError,
        };
        ServerMessage::Error {
            code,
            message: error.to_string(),
        }
    }
}
