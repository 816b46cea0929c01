// src/tail/reader.rs

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use futures::Stream;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::TailSection;
use crate::types::RunState;
use crate::workspace;

use super::frame::TailFrame;

#[derive(Debug, Clone, Copy)]
pub struct TailOptions {
    pub poll_interval: std::time::Duration,
    /// Idle time without data frames before a `: keepalive` comment.
    pub heartbeat: std::time::Duration,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self::from_config(&TailSection::default())
    }
}

impl TailOptions {
    pub fn from_config(cfg: &TailSection) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            heartbeat: cfg.heartbeat(),
        }
    }
}

/// Byte-offset cursor over an append-only log. Only complete lines are
/// consumed; a trailing partial line is left for the next read.
#[derive(Debug)]
pub struct LogCursor {
    path: PathBuf,
    offset: u64,
}

impl LogCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Non-blank lines appended since the last call. A missing file reads
    /// as empty.
    pub async fn read_new_lines(&mut self) -> Vec<String> {
        match self.try_read_new_lines().await {
            Ok(lines) => lines,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to read event log; retrying on next poll");
                Vec::new()
            }
        }
    }

    async fn try_read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=last_newline];
        self.offset += complete.len() as u64;

        Ok(complete
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .filter(|line| !line.trim().is_empty())
            .collect())
    }
}

/// The status document at `path` if it records a terminal state.
///
/// Missing, unreadable or undecodable files count as "no status yet".
pub async fn read_terminal_status(path: &Path) -> Option<Value> {
    let bytes = tokio::fs::read(path).await.ok()?;
    let doc: Value = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(path = ?path, error = %e, "status file not decodable yet");
            return None;
        }
    };
    let state = doc.get("state").and_then(Value::as_str)?;
    RunState::from_status_str(state)
        .filter(|s| s.is_terminal())
        .map(|_| doc)
}

/// Live, replayable feed over a run's raw event log and status file.
///
/// Starts with `: connected`, replays the log from offset zero, follows it
/// while the run is active and ends with exactly one [`TailFrame::Status`]
/// once the status file records a terminal state. Every log line written
/// before the terminal status precedes the status frame.
pub fn tail_events(
    events_path: PathBuf,
    status_path: PathBuf,
    opts: TailOptions,
) -> impl Stream<Item = TailFrame> + Send + 'static {
    async_stream::stream! {
        yield TailFrame::comment("connected");

        let mut cursor = LogCursor::new(events_path);
        let mut last_data = Instant::now();

        loop {
            let lines = cursor.read_new_lines().await;
            if !lines.is_empty() {
                last_data = Instant::now();
            }
            for line in lines {
                yield TailFrame::Data(line);
            }

            if let Some(status) = read_terminal_status(&status_path).await {
                // The drain finishes before the terminal status is written,
                // so one more read picks up anything appended since the last poll.
                for line in cursor.read_new_lines().await {
                    yield TailFrame::Data(line);
                }
                debug!(path = ?status_path, offset = cursor.offset(), "run terminal; closing tail");
                yield TailFrame::Status(status);
                break;
            }

            if last_data.elapsed() >= opts.heartbeat {
                yield TailFrame::comment("keepalive");
                last_data = Instant::now();
            }

            sleep(opts.poll_interval).await;
        }
    }
}

/// [`tail_events`] for `<workspace>/runs/<run_id>`.
pub fn tail_run(
    workspace: &Path,
    run_id: &str,
    opts: TailOptions,
) -> impl Stream<Item = TailFrame> + Send + 'static {
    tail_events(
        workspace::raw_events_path(workspace, run_id),
        workspace::run_status_path(workspace, run_id),
        opts,
    )
}
