// src/config/mod.rs

//! Configuration for agentrun.
//!
//! Responsibilities:
//! - Define the TOML-backed runner configuration (`model.rs`).
//! - Define the per-run agent settings handed in by callers (`agent.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like positive timeouts (`validate.rs`).

pub mod agent;
pub mod loader;
pub mod model;
pub mod validate;

pub use agent::AgentConfig;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ExecutorSection, LoggingSection, ManagerSection, RawConfigFile, TailSection,
};
