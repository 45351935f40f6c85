//! Codedeck Core - Session Orchestration Engine
//!
//! This crate provides the engine behind the codedeck workspace server:
//! - Session: connection-keyed lifecycle of shell processes under ptys
//! - Pty: spawn/pump/terminate plumbing for those processes
//! - Sync: best-effort mirroring between remote storage and scratch dirs
//! - Storage: the injected object-store seam (S3 or in-memory)
//! - Files: the scoped local filesystem view served to clients

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod files;
pub mod pty;
pub mod session;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
pub use files::{EntryKind, FileEntry};
pub use session::{SessionRegistry, TerminalConfig};
pub use storage::{MemoryStore, ObjectPage, ObjectStore, S3Settings, S3Store};
pub use sync::{template_prefix, validate_workspace_id, workspace_prefix, WorkspaceSync};
