// src/exec/mod.rs

//! Agent process execution layer.
//!
//! This module is responsible for actually running the agent CLI, using
//! `tokio::process::Command`, and leaving a complete artifact set behind in
//! the run directory.
//!
//! - [`invocation`] maps run inputs to the agent's argument vector.
//! - [`drain`] reads stdout concurrently and persists raw + normalized events.
//! - [`artifacts`] writes the post-exit files (`result.txt`, `step.json`,
//!   `meta.json`).
//! - [`executor`] owns the process lifecycle (lock, spawn, timeout, kill).
//! - [`backend`] provides the `ExecutionBackend` trait that the run manager
//!   uses in production, and which tests can replace with a fake.

pub mod artifacts;
pub mod backend;
pub mod drain;
pub mod executor;
pub mod invocation;

pub use artifacts::{RunMeta, RunPaths, StepOutcome};
pub use backend::ExecutionBackend;
pub use drain::{DrainStats, DrainSummary};
pub use executor::{ExecutionRequest, ExecutionResult, ProcessExecutor, new_run_id};
pub use invocation::{Invocation, InvocationSpec, build_invocation};
