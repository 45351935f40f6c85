//! Server configuration types
//!
//! Contains all configuration structures for the codedeck server.

use std::path::PathBuf;

use codedeck_core::{S3Settings, TerminalConfig};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub terminal: TerminalSettings,
}

/// Listen address settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which object store backs workspace storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible bucket (production).
    S3,
    /// In-process store, nothing survives a restart (local development).
    Memory,
}

/// Remote storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL for S3-compatible stores (MinIO etc.)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static credentials; the default AWS chain applies when unset.
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_backend() -> StorageBackend {
    StorageBackend::S3
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl StorageConfig {
    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }
}

/// Scratch directory and pull settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root under which per-workspace scratch dirs live; the OS temp dir
    /// when unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
    #[serde(default = "default_max_concurrent_pulls")]
    pub max_concurrent_pulls: usize,
}

fn default_max_concurrent_pulls() -> usize {
    8
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            scratch_root: None,
            max_concurrent_pulls: default_max_concurrent_pulls(),
        }
    }
}

impl WorkspaceConfig {
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Shell settings for terminal sessions (exposed to TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Shell binary; `$SHELL` then `/bin/bash` when unset.
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default = "default_rows")]
    pub rows: u16,
    #[serde(default = "default_cols")]
    pub cols: u16,
}

fn default_rows() -> u16 {
    24
}

fn default_cols() -> u16 {
    80
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            shell: None,
            rows: default_rows(),
            cols: default_cols(),
        }
    }
}

impl From<TerminalSettings> for TerminalConfig {
    fn from(settings: TerminalSettings) -> Self {
        Self {
            shell: settings.shell,
            rows: settings.rows,
            cols: settings.cols,
        }
    }
}
