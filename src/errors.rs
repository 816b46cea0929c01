// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentRunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The workspace lock stayed contended past the wait budget. Callers
    /// should report the workspace as busy; the operation can be retried.
    #[error("Workspace is locked: {} (waited {:?})", lock_path.display(), waited)]
    LockTimeout { lock_path: PathBuf, waited: Duration },

    #[error("Failed to spawn agent process '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentRunError {
    /// True when the error means "busy" rather than "failed".
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, AgentRunError::LockTimeout { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentRunError>;
