// src/exec/artifacts.rs

//! Per-run files written after the process has exited and stdout is drained.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workspace::artifacts;

/// Paths of every artifact in one run directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub raw_events: PathBuf,
    pub normalized_events: PathBuf,
    pub stderr: PathBuf,
    pub result: PathBuf,
    pub step: PathBuf,
    pub meta: PathBuf,
    pub status: PathBuf,
}

impl RunPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            raw_events: dir.join(artifacts::RAW_EVENTS),
            normalized_events: dir.join(artifacts::NORMALIZED_EVENTS),
            stderr: dir.join(artifacts::STDERR),
            result: dir.join(artifacts::RESULT),
            step: dir.join(artifacts::STEP),
            meta: dir.join(artifacts::META),
            status: dir.join(artifacts::STATUS),
        }
    }
}

/// `step.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub instruction: String,
    pub session_id_before: Option<String>,
    pub session_id_after: Option<String>,
    pub fork: bool,
    pub timed_out: bool,
    pub exit_code: i32,
}

/// `meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub exit_code: i32,
    pub timed_out: bool,
    pub session_id_before: Option<String>,
    pub session_id_after: Option<String>,
    #[serde(rename = "apiKeySource")]
    pub api_key_source: Option<String>,
    pub permission_mode: String,
    pub policy_preset: String,
    pub model: Option<String>,
}

pub fn write_result_text(paths: &RunPaths, text: &str) -> Result<()> {
    fs::write(&paths.result, text).with_context(|| format!("writing {:?}", paths.result))
}

pub fn write_step(paths: &RunPaths, step: &StepOutcome) -> Result<()> {
    write_pretty(&paths.step, step)
}

pub fn write_meta(paths: &RunPaths, meta: &RunMeta) -> Result<()> {
    write_pretty(&paths.meta, meta)
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("serializing run artifact")?;
    fs::write(path, body).with_context(|| format!("writing {:?}", path))
}
