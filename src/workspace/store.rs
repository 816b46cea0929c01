// src/workspace/store.rs

//! Reads and writes of the shared workspace state.
//!
//! Writers must hold the [`WorkspaceLock`](super::WorkspaceLock). Readers of
//! the append-only message log and of status records need no lock: status
//! records are replaced atomically, so a reader sees either the old or the new
//! document, never a torn one.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::records::{Message, RunStatus, SessionRecord};
use super::{messages_path, run_status_path, session_path};

/// Serialize `value` as pretty JSON into `path` via a temp file + rename.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    let tmp = temp_path(path);
    let body = serde_json::to_vec_pretty(value).context("serializing JSON document")?;
    fs::write(&tmp, body).with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read a JSON document, treating a missing or undecodable file as absent.
pub fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match fs::read(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match serde_json::from_slice(&contents) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(path = ?path, error = %e, "ignoring undecodable JSON document");
            None
        }
    }
}

pub fn load_session(ws: &Path) -> Option<SessionRecord> {
    read_json_lenient(&session_path(ws))
}

/// Current session token of the workspace, if any run has reported one.
pub fn load_session_id(ws: &Path) -> Option<String> {
    load_session(ws)
        .and_then(|s| s.session_id)
        .filter(|sid| !sid.is_empty())
}

pub fn save_session_id(ws: &Path, session_id: Option<&str>, last_run_id: Option<&str>) -> Result<()> {
    let record = SessionRecord {
        session_id: session_id.map(str::to_string),
        updated_at: Utc::now(),
        last_run_id: last_run_id.map(str::to_string),
    };
    atomic_write_json(&session_path(ws), &record)
}

/// Append one message to `messages.ndjson`.
pub fn append_message(ws: &Path, msg: &Message) -> Result<()> {
    let path = messages_path(ws);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    let mut line = serde_json::to_string(msg).context("serializing message")?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening message log {:?}", path))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("appending to message log {:?}", path))?;
    Ok(())
}

/// The last `limit` well-formed messages, oldest first. Malformed lines are
/// skipped.
pub fn load_messages(ws: &Path, limit: usize) -> Result<Vec<Message>> {
    let path = messages_path(ws);
    let file = match fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("opening message log {:?}", path)),
    };

    let mut messages = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("reading message log {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(&line) {
            Ok(msg) => messages.push(msg),
            Err(e) => debug!(error = %e, "skipping malformed message line"),
        }
    }

    let skip = messages.len().saturating_sub(limit);
    Ok(messages.split_off(skip))
}

pub fn new_message_id() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn write_run_status(ws: &Path, status: &RunStatus) -> Result<()> {
    atomic_write_json(&run_status_path(ws, &status.run_id), status)
}

/// Persisted status of a run, or `None` if it has not been written yet.
pub fn read_run_status(ws: &Path, run_id: &str) -> Option<RunStatus> {
    read_json_lenient(&run_status_path(ws, run_id))
}
