// src/workspace/mod.rs

//! On-disk workspace layout and the state shared by all runs of a workspace.
//!
//! ```text
//! <workspace>/
//!   .locks/workspace.lock
//!   .env
//!   kb/
//!   session.json
//!   messages.ndjson
//!   runs/<run_id>/{events.ndjson, events_norm.ndjson, stderr.log,
//!                  result.txt, step.json, meta.json, status.json}
//! ```
//!
//! - [`lock`] serializes mutators of one workspace.
//! - [`store`] reads and writes the session file, message log and status
//!   records.
//! - [`env`] merges the workspace `.env` into the agent's environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod env;
pub mod lock;
pub mod records;
pub mod store;

pub use lock::WorkspaceLock;
pub use records::{Message, MessageRole, RunStatus, SessionRecord};

pub const KB_DIR: &str = "kb";
pub const RUNS_DIR: &str = "runs";
pub const SESSION_FILE: &str = "session.json";
pub const MESSAGES_FILE: &str = "messages.ndjson";

/// File names inside a run directory.
pub mod artifacts {
    pub const RAW_EVENTS: &str = "events.ndjson";
    pub const NORMALIZED_EVENTS: &str = "events_norm.ndjson";
    pub const STDERR: &str = "stderr.log";
    pub const RESULT: &str = "result.txt";
    pub const STEP: &str = "step.json";
    pub const META: &str = "meta.json";
    pub const STATUS: &str = "status.json";

    /// Every artifact a run directory holds once the run is terminal.
    pub const ALL: [&str; 7] = [
        RAW_EVENTS,
        NORMALIZED_EVENTS,
        STDERR,
        RESULT,
        STEP,
        META,
        STATUS,
    ];
}

pub fn kb_dir(ws: &Path) -> PathBuf {
    ws.join(KB_DIR)
}

pub fn runs_dir(ws: &Path) -> PathBuf {
    ws.join(RUNS_DIR)
}

pub fn run_dir(ws: &Path, run_id: &str) -> PathBuf {
    runs_dir(ws).join(run_id)
}

pub fn session_path(ws: &Path) -> PathBuf {
    ws.join(SESSION_FILE)
}

pub fn messages_path(ws: &Path) -> PathBuf {
    ws.join(MESSAGES_FILE)
}

pub fn run_status_path(ws: &Path, run_id: &str) -> PathBuf {
    run_dir(ws, run_id).join(artifacts::STATUS)
}

pub fn raw_events_path(ws: &Path, run_id: &str) -> PathBuf {
    run_dir(ws, run_id).join(artifacts::RAW_EVENTS)
}

/// Create `kb/` and `runs/` so a workspace can be used without scaffolding.
pub fn ensure_layout(ws: &Path) -> Result<()> {
    for dir in [kb_dir(ws), runs_dir(ws)] {
        fs::create_dir_all(&dir).with_context(|| format!("creating dir {:?}", dir))?;
    }
    Ok(())
}
