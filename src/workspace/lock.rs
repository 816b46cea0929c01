// src/workspace/lock.rs

//! Per-workspace mutual exclusion.
//!
//! The lock is an OS advisory exclusive lock on `.locks/workspace.lock`.
//! Acquisition polls `try_lock_exclusive` until a deadline so that waiting
//! never blocks a Tokio worker thread. The lock is not re-entrant: a second
//! acquisition of the same workspace, even from the same task, waits and then
//! times out.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::errors::{AgentRunError, Result};

pub const LOCKS_DIR: &str = ".locks";
pub const LOCK_FILE: &str = "workspace.lock";

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

pub fn lock_path(workspace: &Path) -> PathBuf {
    workspace.join(LOCKS_DIR).join(LOCK_FILE)
}

/// A held workspace lock. Released by [`WorkspaceLock::release`] or on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    file: Option<File>,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Acquire the lock for `workspace`, waiting at most `timeout`.
    ///
    /// Fails with [`AgentRunError::LockTimeout`] if the lock is still held
    /// elsewhere when the deadline passes.
    pub async fn acquire(workspace: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(workspace);
        let file = open_lock_file(&path)?;
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(lock = ?path, waited = ?started.elapsed(), "workspace lock acquired");
                    return Ok(Self {
                        file: Some(file),
                        path,
                    });
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(AgentRunError::IoError(e)),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(lock = ?path, ?timeout, "workspace lock wait timed out");
                return Err(AgentRunError::LockTimeout {
                    lock_path: path,
                    waited: started.elapsed(),
                });
            }
            sleep(RETRY_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Release the lock. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!(lock = ?self.path, error = %e, "failed to unlock workspace lock; closing file");
            }
            debug!(lock = ?self.path, "workspace lock released");
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
