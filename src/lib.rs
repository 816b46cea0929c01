// src/lib.rs

pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod stream;
pub mod tail;
pub mod types;
pub mod workspace;

use std::path::Path;

use anyhow::Result;
use tracing::debug;

pub use crate::config::{AgentConfig, ConfigFile};
pub use crate::engine::{ManagerSettings, RunManager, RunRequest};
pub use crate::errors::AgentRunError;
pub use crate::exec::{ExecutionBackend, ExecutionRequest, ExecutionResult, ProcessExecutor};
pub use crate::tail::{TailFrame, TailOptions, tail_run};
pub use crate::types::{PolicyPreset, RunState};
pub use crate::workspace::RunStatus;

/// Build a run manager backed by the real agent process executor.
///
/// This wires together:
/// - `[executor]` -> [`ProcessExecutor`]
/// - `[manager]` -> [`ManagerSettings`]
pub fn run_manager(cfg: &ConfigFile) -> RunManager<ProcessExecutor> {
    debug!(
        program = %cfg.executor.program,
        policy_preset = %cfg.manager.policy_preset,
        "building run manager"
    );
    RunManager::new(
        ProcessExecutor::from_config(&cfg.executor),
        ManagerSettings::from_config(&cfg.manager),
    )
}

/// High-level entry point for embedding programs.
///
/// Loads and validates the config file, installs logging from `[logging]`
/// and returns the validated config with a ready [`RunManager`].
pub fn init_from_config_file(path: &Path) -> Result<(ConfigFile, RunManager<ProcessExecutor>)> {
    let cfg = config::load_and_validate(path)?;
    logging::init_logging(cfg.logging.level)?;
    let manager = run_manager(&cfg);
    Ok((cfg, manager))
}
