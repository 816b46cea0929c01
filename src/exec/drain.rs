// src/exec/drain.rs

//! Concurrent stdout drain for one agent process.
//!
//! Every raw line is appended to `events.ndjson` and every normalized record
//! (or parse-error marker) to `events_norm.ndjson` as soon as it is read, so
//! tail readers see output while the process is still running.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, anyhow};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::stream::normalize::{NormalizedEvent, normalize_event, parse_error_record};
use crate::stream::parser::{AsyncStreamLines, StreamLine};

#[derive(Debug, Default)]
struct Accumulated {
    session_id: Option<String>,
    api_key_source: Option<String>,
    deltas: Vec<String>,
    result_text: Option<String>,
}

/// What the drain learned about the run, read back once after exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainSummary {
    pub session_id: Option<String>,
    pub api_key_source: Option<String>,
    /// Last result text if any was seen, else the concatenated deltas.
    pub final_text: String,
}

/// Single-writer (drain task) / single-final-reader (executor) cell.
#[derive(Debug, Clone)]
pub(crate) struct Accumulator {
    inner: Arc<Mutex<Accumulated>>,
}

impl Accumulator {
    /// Seed with the session token the run started from; later tokens replace it.
    pub(crate) fn new(session_id: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Accumulated {
                session_id,
                ..Accumulated::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Accumulated> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: &NormalizedEvent) {
        let mut acc = self.lock();
        if let Some(sid) = &event.session_id {
            acc.session_id = Some(sid.clone());
        }
        if let Some(source) = &event.api_key_source {
            acc.api_key_source = Some(source.clone());
        }
        if let Some(delta) = &event.text_delta {
            acc.deltas.push(delta.clone());
        }
        if let Some(result) = &event.result_text {
            acc.result_text = Some(result.clone());
        }
    }

    pub(crate) fn summary(&self) -> DrainSummary {
        let acc = self.lock();
        let final_text = match &acc.result_text {
            Some(result) => result.clone(),
            None => acc.deltas.concat(),
        };
        DrainSummary {
            session_id: acc.session_id.clone(),
            api_key_source: acc.api_key_source.clone(),
            final_text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub lines: usize,
    pub malformed: usize,
}

pub(crate) struct DrainTarget {
    pub raw_events: PathBuf,
    pub normalized_events: PathBuf,
    pub run_id: String,
}

/// Read `stdout` to EOF, persisting and normalizing every line.
///
/// A read error on the pipe ends the drain (logged); a write error on either
/// log is returned.
pub(crate) async fn drain_stdout<R>(
    stdout: R,
    target: DrainTarget,
    accumulator: Accumulator,
) -> Result<DrainStats>
where
    R: AsyncRead + Unpin,
{
    let mut raw_log = File::create(&target.raw_events)
        .await
        .with_context(|| format!("creating raw event log {:?}", target.raw_events))?;
    let mut norm_log = File::create(&target.normalized_events)
        .await
        .with_context(|| format!("creating normalized event log {:?}", target.normalized_events))?;

    let mut lines = AsyncStreamLines::new(BufReader::new(stdout));
    let mut stats = DrainStats::default();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(run_id = %target.run_id, error = %e, "error reading agent stdout; ending drain");
                break;
            }
        };

        trace!(run_id = %target.run_id, line = line.raw(), "agent stdout");
        append_line(&mut raw_log, line.raw())
            .await
            .with_context(|| format!("appending to {:?}", target.raw_events))?;

        let record = match line {
            StreamLine::Record { obj, .. } => {
                let event = normalize_event(obj);
                accumulator.record(&event);
                event.log_record()
            }
            StreamLine::Malformed { raw, reason } => {
                debug!(run_id = %target.run_id, %reason, "malformed agent stdout line");
                stats.malformed += 1;
                parse_error_record(&raw, &reason)
            }
        };

        let encoded = serde_json::to_string(&record).context("encoding normalized event")?;
        append_line(&mut norm_log, &encoded)
            .await
            .with_context(|| format!("appending to {:?}", target.normalized_events))?;
        stats.lines += 1;
    }

    debug!(
        run_id = %target.run_id,
        lines = stats.lines,
        malformed = stats.malformed,
        "agent stdout drained"
    );
    Ok(stats)
}

async fn append_line(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}

/// Join a spawned drain, then report the outcome of waiting on the process.
///
/// The drain is always awaited first, so no log write is still in flight when
/// this returns, whichever side failed. A wait error takes precedence over a
/// drain error.
pub async fn join_drain<T>(waited: Result<T>, drain: JoinHandle<Result<DrainStats>>) -> Result<T> {
    let drained = drain.await;
    let value = waited?;
    match drained {
        Ok(Ok(stats)) => {
            debug!(lines = stats.lines, malformed = stats.malformed, "stdout drain joined");
            Ok(value)
        }
        Ok(Err(e)) => Err(e.context("draining agent stdout")),
        Err(e) => Err(anyhow!("stdout drain task failed: {e}")),
    }
}
