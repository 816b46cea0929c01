// src/engine/mod.rs

//! Run orchestration.
//!
//! The [`RunManager`] accepts run requests from the request layer, runs each
//! one as its own Tokio task and records the `running -> completed | failed`
//! transitions in the run's status file. Process execution itself is
//! delegated to an [`ExecutionBackend`](crate::exec::ExecutionBackend).

use std::path::PathBuf;

pub mod manager;

pub use manager::{ManagerSettings, RunManager};

/// One begin-run call: which workspace, which identifier, which instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub workspace: PathBuf,
    pub run_id: String,
    /// Instruction text handed to the agent.
    pub content: String,
}

impl RunRequest {
    pub fn new(
        workspace: impl Into<PathBuf>,
        run_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            run_id: run_id.into(),
            content: content.into(),
        }
    }
}
