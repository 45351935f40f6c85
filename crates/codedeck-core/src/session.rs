//! Session registry: connection identity → live shell session.
//!
//! All lifecycle transitions go through the single mutex around the table.
//! Critical sections are limited to table operations plus the in-lock pty
//! write, which is what serializes concurrent writers to one session.
//!
//! Teardown can be triggered from two sides: the connection disconnecting
//! (explicit [`SessionRegistry::clear`]) and the process exiting (the exit
//! watcher). Whoever removes the entry from the table owns termination, and
//! the watcher only removes the entry whose epoch it was started for, so the
//! two paths cannot double-terminate or tear down a replacement session.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task;
use uuid::Uuid;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pty::{self, ShellProcess, DEFAULT_SHELL};

/// Shell settings applied to every spawned session.
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// Shell binary; `$SHELL` then `/bin/bash` when unset.
    pub shell: Option<String>,
    /// Initial pty rows.
    pub rows: u16,
    /// Initial pty columns.
    pub cols: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: None,
            rows: 24,
            cols: 80,
        }
    }
}

struct Session {
    workspace_id: String,
    /// Identity of this particular spawn; the exit watcher compares it
    /// before removing the entry.
    epoch: Uuid,
    process: ShellProcess,
}

/// Mutex-guarded table of live sessions, keyed by connection identity.
///
/// Cheap to clone; all clones share the same table.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
    config: Arc<TerminalConfig>,
}

impl SessionRegistry {
    /// Registry spawning shells per `config`.
    pub fn new(config: TerminalConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Spawn a shell for `conn_id` inside `working_dir` and wire its output
    /// to `output_tx`.
    ///
    /// An existing session for the same connection is terminated first: a
    /// second `requestTerminal` replaces, never stacks. On spawn failure the
    /// error propagates and no entry is stored.
    pub async fn create(
        &self,
        conn_id: Uuid,
        workspace_id: &str,
        working_dir: &Path,
        output_tx: UnboundedSender<Vec<u8>>,
    ) -> Result<()> {
        if let Some(mut previous) = self.sessions.lock().await.remove(&conn_id) {
            debug!(%conn_id, "replacing existing session");
            previous.process.terminate();
        }

        let shell = self
            .config
            .shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        let (rows, cols) = (self.config.rows, self.config.cols);
        let dir = working_dir.to_path_buf();

        // openpty + fork are blocking syscalls.
        let spawned = task::spawn_blocking(move || pty::spawn_shell(&shell, &dir, rows, cols))
            .await
            .map_err(|e| Error::Process(format!("spawn task failed: {}", e)))??;

        pty::spawn_read_pump(spawned.reader, output_tx);

        let epoch = Uuid::new_v4();
        let session = Session {
            workspace_id: workspace_id.to_string(),
            epoch,
            process: spawned.process,
        };
        if let Some(mut evicted) = self.sessions.lock().await.insert(conn_id, session) {
            // A concurrent create for the same connection won the race to
            // insert first; it loses the replace.
            evicted.process.terminate();
        }

        debug!(%conn_id, workspace = %workspace_id, "session created");
        self.spawn_exit_watcher(conn_id, epoch, spawned.child);
        Ok(())
    }

    /// Forward input bytes to the connection's shell, in call order.
    pub async fn write(&self, conn_id: Uuid, data: &[u8]) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&conn_id)
            .ok_or_else(|| Error::NotFound(format!("no session for connection {}", conn_id)))?;
        session.process.write(data)
    }

    /// Resize the connection's pty.
    pub async fn resize(&self, conn_id: Uuid, rows: u16, cols: u16) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&conn_id)
            .ok_or_else(|| Error::NotFound(format!("no session for connection {}", conn_id)))?;
        session.process.resize(rows, cols)
    }

    /// Tear down the connection's session. No-op when absent; safe to call
    /// concurrently with itself and with the exit watcher.
    pub async fn clear(&self, conn_id: Uuid) {
        let removed = self.sessions.lock().await.remove(&conn_id);
        if let Some(mut session) = removed {
            debug!(%conn_id, workspace = %session.workspace_id, "session cleared");
            session.process.terminate();
        }
    }

    /// Remove the entry only if it still belongs to the spawn identified by
    /// `epoch`.
    async fn clear_if_epoch(&self, conn_id: Uuid, epoch: Uuid) {
        let removed = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get(&conn_id) {
                Some(session) if session.epoch == epoch => sessions.remove(&conn_id),
                _ => None,
            }
        };
        if let Some(mut session) = removed {
            debug!(%conn_id, "session removed after process exit");
            session.process.terminate();
        }
    }

    fn spawn_exit_watcher(
        &self,
        conn_id: Uuid,
        epoch: Uuid,
        mut child: Box<dyn portable_pty::Child + Send + Sync>,
    ) {
        let registry = self.clone();
        tokio::spawn(async move {
            let status = task::spawn_blocking(move || child.wait()).await;
            match status {
                Ok(Ok(status)) => {
                    debug!(%conn_id, code = status.exit_code(), "session process exited")
                }
                Ok(Err(error)) => warn!(%conn_id, %error, "failed to reap session process"),
                Err(error) => warn!(%conn_id, %error, "exit watcher task failed"),
            }
            registry.clear_if_epoch(conn_id, epoch).await;
        });
    }
}
