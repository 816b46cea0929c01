// src/engine/manager.rs

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{AgentConfig, ManagerSection};
use crate::errors::Result;
use crate::exec::{ExecutionBackend, ExecutionRequest};
use crate::workspace::{self, Message, RunStatus, WorkspaceLock, store};

use super::RunRequest;

/// Fixed settings applied to every run a [`RunManager`] starts.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Budget for each of the manager's own short lock waits.
    pub lock_timeout: Duration,
    pub agent: AgentConfig,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::from_config(&ManagerSection::default())
    }
}

impl ManagerSettings {
    pub fn from_config(cfg: &ManagerSection) -> Self {
        Self {
            lock_timeout: cfg.lock_timeout(),
            agent: cfg.agent_config(),
        }
    }
}

type RunKey = (PathBuf, String);

/// What the manager remembers about an accepted run.
enum RunSlot {
    Active(JoinHandle<()>),
    /// Finished and reaped; the identifier stays claimed.
    Done,
}

impl RunSlot {
    fn is_running(&self) -> bool {
        matches!(self, RunSlot::Active(handle) if !handle.is_finished())
    }
}

/// Maps run identifiers to executions and persists their status transitions.
///
/// Every accepted run is one Tokio task. Identifiers stay claimed for the
/// lifetime of the manager, so a terminal run is never executed again.
pub struct RunManager<B: ExecutionBackend + 'static> {
    backend: Arc<B>,
    settings: Arc<ManagerSettings>,
    runs: Mutex<HashMap<RunKey, RunSlot>>,
}

impl<B: ExecutionBackend + 'static> fmt::Debug for RunManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunManager")
            .field("settings", &self.settings)
            .field("runs", &self.runs().len())
            .finish_non_exhaustive()
    }
}

impl<B: ExecutionBackend + 'static> RunManager<B> {
    pub fn new(backend: B, settings: ManagerSettings) -> Self {
        Self::with_shared_backend(Arc::new(backend), settings)
    }

    pub fn with_shared_backend(backend: Arc<B>, settings: ManagerSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<RunKey, RunSlot>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a run in the background.
    ///
    /// Returns `false` (and does nothing else) if the identifier was already
    /// accepted for this workspace. Never fails: every error that happens
    /// while the run executes ends up in its `failed` status record.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, req: RunRequest) -> bool {
        let key = (req.workspace.clone(), req.run_id.clone());
        let mut runs = self.runs();
        reap_finished(&mut runs);
        if runs.contains_key(&key) {
            debug!(run_id = %req.run_id, workspace = ?req.workspace, "run already accepted; ignoring");
            return false;
        }

        info!(run_id = %req.run_id, workspace = ?req.workspace, "run accepted");
        let backend = Arc::clone(&self.backend);
        let settings = Arc::clone(&self.settings);
        let handle = tokio::spawn(async move {
            run_to_completion(backend.as_ref(), &settings, req).await;
        });
        runs.insert(key, RunSlot::Active(handle));
        true
    }

    /// Persisted status of a run; `None` if nothing has been written yet.
    pub fn status(&self, workspace: &Path, run_id: &str) -> Option<RunStatus> {
        store::read_run_status(workspace, run_id)
    }

    pub fn artifacts_dir(&self, workspace: &Path, run_id: &str) -> PathBuf {
        workspace::run_dir(workspace, run_id)
    }

    /// True while the run's task is still executing.
    pub fn is_active(&self, workspace: &Path, run_id: &str) -> bool {
        let key = (workspace.to_path_buf(), run_id.to_string());
        self.runs().get(&key).is_some_and(RunSlot::is_running)
    }

    /// Wait for a run started by this manager to finish.
    ///
    /// Returns `false` only if the run is unknown. A run that already
    /// finished, or that another caller is waiting on, returns at once.
    pub async fn wait(&self, workspace: &Path, run_id: &str) -> bool {
        let key = (workspace.to_path_buf(), run_id.to_string());
        let slot = match self.runs().get_mut(&key) {
            Some(slot) => std::mem::replace(slot, RunSlot::Done),
            None => return false,
        };
        if let RunSlot::Active(handle) = slot {
            if let Err(e) = handle.await {
                error!(run_id, error = %e, "run task aborted");
            }
        }
        true
    }
}

/// Drop the join handles of finished runs, keeping their identifiers claimed.
fn reap_finished(runs: &mut HashMap<RunKey, RunSlot>) {
    for slot in runs.values_mut() {
        if matches!(slot, RunSlot::Active(handle) if handle.is_finished()) {
            *slot = RunSlot::Done;
        }
    }
}

async fn run_to_completion<B: ExecutionBackend + ?Sized>(
    backend: &B,
    settings: &ManagerSettings,
    req: RunRequest,
) {
    let started_at = Utc::now();
    let outcome = AssertUnwindSafe(execute_run(backend, settings, &req, started_at))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(status)) => info!(
            run_id = %req.run_id,
            exit_code = ?status.exit_code,
            timed_out = ?status.timed_out,
            "run completed"
        ),
        Ok(Err(err)) => {
            error!(run_id = %req.run_id, error = %err, "run failed");
            let description = err.to_string();
            let trace = format!("{:?}", anyhow::Error::from(err));
            record_failure(settings, &req, started_at, description, trace).await;
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(run_id = %req.run_id, panic = %message, "run panicked");
            let description = format!("run panicked: {message}");
            record_failure(settings, &req, started_at, description, message).await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn execute_run<B: ExecutionBackend + ?Sized>(
    backend: &B,
    settings: &ManagerSettings,
    req: &RunRequest,
    started_at: DateTime<Utc>,
) -> Result<RunStatus> {
    let ws = req.workspace.as_path();

    let session_id = {
        let _lock = WorkspaceLock::acquire(ws, settings.lock_timeout).await?;
        let session_id = store::load_session_id(ws);
        store::write_run_status(ws, &RunStatus::running(&req.run_id, started_at))?;
        session_id
    };

    // The executor takes the workspace lock itself, only around its own I/O.
    let result = backend
        .execute(
            ExecutionRequest::new(req.content.clone(), ws)
                .with_agent(settings.agent.clone())
                .with_session_id(session_id)
                .with_run_id(req.run_id.clone()),
        )
        .await?;

    let _lock = WorkspaceLock::acquire(ws, settings.lock_timeout).await?;
    store::append_message(ws, &Message::assistant_for_run(&req.run_id, result.final_text))?;
    store::save_session_id(ws, result.session_id_after.as_deref(), Some(&req.run_id))?;
    let status = RunStatus::completed(
        &req.run_id,
        started_at,
        result.exit_code,
        result.timed_out,
        result.session_id_after,
    );
    store::write_run_status(ws, &status)?;
    Ok(status)
}

/// Write the `failed` status, under the lock if it can be had in time.
async fn record_failure(
    settings: &ManagerSettings,
    req: &RunRequest,
    started_at: DateTime<Utc>,
    description: String,
    trace: String,
) {
    let ws = req.workspace.as_path();

    let _lock = match WorkspaceLock::acquire(ws, settings.lock_timeout).await {
        Ok(lock) => Some(lock),
        Err(e) => {
            warn!(run_id = %req.run_id, error = %e, "writing failed status without the workspace lock");
            None
        }
    };

    let status = RunStatus::failed(&req.run_id, started_at, description, trace);
    if let Err(e) = store::write_run_status(ws, &status) {
        error!(run_id = %req.run_id, error = %e, "could not write failed status");
    }
}
