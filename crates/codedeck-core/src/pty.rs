//! Pseudo-terminal process plumbing.
//!
//! Spawns an interactive shell with its controlling terminal rooted at a
//! workspace's scratch directory and pumps its output into a channel. The
//! read pump runs on a dedicated OS thread because pty reads block; it exits
//! on end-of-stream, which is how both process exit and explicit termination
//! are observed.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::error::{Error, Result};

const READ_CHUNK_SIZE: usize = 4096;

/// Fallback shell when neither config nor `$SHELL` name one.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Handles kept by the session registry for a running shell.
///
/// The child handle itself is surrendered to the exit watcher; termination
/// goes through the cloned killer, so killing and waiting never contend for
/// the same handle.
pub struct ShellProcess {
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

/// Everything produced by a successful spawn.
pub struct SpawnedShell {
    /// Write/resize/terminate handle, stored in the registry.
    pub process: ShellProcess,
    /// Master-side reader for the read pump.
    pub reader: Box<dyn Read + Send>,
    /// Child handle for the exit watcher.
    pub child: Box<dyn Child + Send + Sync>,
}

/// Spawn `shell` with cwd `working_dir` under a new pty.
///
/// Fails with [`Error::Process`] when the directory is missing or the shell
/// cannot be executed; nothing is left behind on failure.
pub fn spawn_shell(shell: &str, working_dir: &Path, rows: u16, cols: u16) -> Result<SpawnedShell> {
    if !working_dir.is_dir() {
        return Err(Error::Process(format!(
            "working directory does not exist: {}",
            working_dir.display()
        )));
    }

    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| Error::Process(format!("failed to open pty: {:#}", e)))?;

    let mut cmd = CommandBuilder::new(shell);
    cmd.cwd(working_dir);
    cmd.env("TERM", "xterm-256color");

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| Error::Process(format!("failed to spawn {}: {:#}", shell, e)))?;
    // The master keeps its own handle; holding the slave open would mask EOF.
    drop(pair.slave);

    let killer = child.clone_killer();

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| Error::Process(format!("failed to clone pty reader: {:#}", e)))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| Error::Process(format!("failed to take pty writer: {:#}", e)))?;

    debug!(%shell, dir = %working_dir.display(), rows, cols, "shell spawned");

    Ok(SpawnedShell {
        process: ShellProcess {
            master: Some(pair.master),
            writer: Some(writer),
            killer,
        },
        reader,
        child,
    })
}

/// Run the read pump on a dedicated thread: forward each chunk to `tx`
/// until end-of-stream or a read error, then exit.
///
/// Dropping the receiver also stops the pump at the next chunk.
pub fn spawn_read_pump(mut reader: Box<dyn Read + Send>, tx: UnboundedSender<Vec<u8>>) {
    std::thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    trace!(bytes = n, "pty output chunk");
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

impl ShellProcess {
    /// Forward bytes verbatim to the shell's input. The caller owns message
    /// boundaries; `write_all` retries partial writes until complete.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Process("terminal already closed".into()))?;
        writer
            .write_all(data)
            .map_err(|e| Error::Process(format!("failed to write to pty: {}", e)))?;
        writer
            .flush()
            .map_err(|e| Error::Process(format!("failed to flush pty: {}", e)))?;
        Ok(())
    }

    /// Resize the pty.
    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<()> {
        let master = self
            .master
            .as_ref()
            .ok_or_else(|| Error::Process("terminal already closed".into()))?;
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| Error::Process(format!("failed to resize pty: {:#}", e)))
    }

    /// Close the pty (unblocking the read pump) and kill the process.
    /// Safe to call repeatedly and after the process has already exited.
    pub fn terminate(&mut self) {
        self.writer.take();
        self.master.take();
        if let Err(error) = self.killer.kill() {
            trace!(%error, "kill after exit");
        }
    }
}

impl Drop for ShellProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
