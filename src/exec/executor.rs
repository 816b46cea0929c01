// src/exec/executor.rs

//! Agent process lifecycle: spawn, drain, timeout, persist.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{AgentConfig, ExecutorSection};
use crate::errors::{AgentRunError, Result};
use crate::exec::artifacts::{self, RunMeta, RunPaths, StepOutcome};
use crate::exec::drain::{Accumulator, DrainTarget, drain_stdout, join_drain};
use crate::exec::invocation::{Invocation, InvocationSpec, build_invocation};
use crate::types::PolicyPreset;
use crate::workspace::{self, WorkspaceLock, env};

/// Everything needed to run the agent once.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub instruction: String,
    pub workspace: PathBuf,
    pub agent: AgentConfig,
    /// Session token to resume from.
    pub session_id: Option<String>,
    pub fork: bool,
    /// Run identifier; generated when neither this nor `run_dir` is set.
    pub run_id: Option<String>,
    /// Explicit run directory; defaults to `<workspace>/runs/<run_id>`.
    pub run_dir: Option<PathBuf>,
}

impl ExecutionRequest {
    pub fn new(instruction: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            instruction: instruction.into(),
            workspace: workspace.into(),
            agent: AgentConfig::default(),
            session_id: None,
            fork: false,
            run_id: None,
            run_dir: None,
        }
    }

    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_fork(mut self, fork: bool) -> Self {
        self.fork = fork;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_run_dir(mut self, run_dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(run_dir.into());
        self
    }
}

/// Outcome of one agent process. A timeout is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub exit_code: i32,
    pub timed_out: bool,
    pub session_id_before: Option<String>,
    pub session_id_after: Option<String>,
    pub api_key_source: Option<String>,
    pub final_text: String,
}

/// Spawns and supervises the agent CLI.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    repo_root: PathBuf,
    timeout: Duration,
    lock_timeout: Duration,
    kill_grace: Duration,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::from_config(&ExecutorSection::default())
    }
}

impl ProcessExecutor {
    pub fn from_config(cfg: &ExecutorSection) -> Self {
        Self {
            program: cfg.program.clone(),
            repo_root: cfg.repo_root.clone(),
            timeout: cfg.timeout(),
            lock_timeout: cfg.lock_timeout(),
            kill_grace: cfg.kill_grace(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_repo_root(mut self, repo_root: impl Into<PathBuf>) -> Self {
        self.repo_root = repo_root.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_kill_grace(mut self, kill_grace: Duration) -> Self {
        self.kill_grace = kill_grace;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the agent once for `req.instruction` inside `req.workspace`.
    ///
    /// The workspace lock is held from just before spawn until the process
    /// has exited **and** its stdout is fully drained. Fails with
    /// [`AgentRunError::LockTimeout`] before anything is spawned if the
    /// workspace stays busy, and with [`AgentRunError::SpawnFailed`] if the
    /// program cannot be started.
    pub async fn execute(&self, req: ExecutionRequest) -> Result<ExecutionResult> {
        let (run_id, run_dir) = resolve_run_location(&req);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("creating run dir {:?}", run_dir))?;
        let paths = RunPaths::new(&run_dir);

        let system_prompt = read_optional_text(req.agent.system_prompt_path.as_deref());
        let append_system_prompt =
            read_optional_text(req.agent.append_system_prompt_path.as_deref());

        let add_dirs = self.accessible_dirs(&req);
        let invocation = build_invocation(&InvocationSpec {
            program: &self.program,
            prompt: &req.instruction,
            agent: &req.agent,
            resume: req.session_id.as_deref(),
            fork: req.fork,
            add_dirs: &add_dirs,
            system_prompt: system_prompt.as_deref(),
            append_system_prompt: append_system_prompt.as_deref(),
        });

        let env_overlay = env::overlay_for_workspace(&req.workspace);
        let accumulator = Accumulator::new(req.session_id.clone());
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            workspace = ?req.workspace,
            program = %self.program,
            resume = req.session_id.is_some(),
            "starting agent run"
        );

        let mut lock = WorkspaceLock::acquire(&req.workspace, self.lock_timeout).await?;
        let supervised = self
            .spawn_and_supervise(&invocation, &req.workspace, env_overlay, &paths, &run_id, &accumulator)
            .await;
        lock.release();
        let (exit_code, timed_out) = supervised?;

        let finished_at = Utc::now();
        let summary = accumulator.summary();

        artifacts::write_result_text(&paths, &summary.final_text)?;
        artifacts::write_step(
            &paths,
            &StepOutcome {
                instruction: req.instruction.clone(),
                session_id_before: req.session_id.clone(),
                session_id_after: summary.session_id.clone(),
                fork: req.fork,
                timed_out,
                exit_code,
            },
        )?;
        artifacts::write_meta(
            &paths,
            &self.run_meta(&req, &run_id, &paths, &invocation, started_at, finished_at, exit_code, timed_out, &summary),
        )?;

        info!(
            run_id = %run_id,
            exit_code,
            timed_out,
            final_text_len = summary.final_text.len(),
            "agent run finished"
        );

        Ok(ExecutionResult {
            run_id,
            run_dir,
            exit_code,
            timed_out,
            session_id_before: req.session_id,
            session_id_after: summary.session_id,
            api_key_source: summary.api_key_source,
            final_text: summary.final_text,
        })
    }

    /// Workspace, its `kb/`, the repository root, then the agent's own dirs.
    fn accessible_dirs(&self, req: &ExecutionRequest) -> Vec<PathBuf> {
        let mut dirs = vec![
            req.workspace.clone(),
            workspace::kb_dir(&req.workspace),
            self.repo_root.clone(),
        ];
        dirs.extend(req.agent.add_dirs.iter().cloned());
        dirs
    }

    /// Spawn the process, drain stdout concurrently and wait for exit under
    /// the execution timeout. Returns `(exit_code, timed_out)` once both the
    /// process and the drain are done.
    async fn spawn_and_supervise(
        &self,
        invocation: &Invocation,
        cwd: &Path,
        env_overlay: impl IntoIterator<Item = (String, String)>,
        paths: &RunPaths,
        run_id: &str,
        accumulator: &Accumulator,
    ) -> Result<(i32, bool)> {
        let stderr_file = fs::File::create(&paths.stderr)
            .with_context(|| format!("creating stderr log {:?}", paths.stderr))?;

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args())
            .current_dir(cwd)
            .envs(env_overlay)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_file))
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| AgentRunError::SpawnFailed {
            program: invocation.program().to_string(),
            source,
        })?;
        debug!(run_id, pid = ?child.id(), "agent process spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("agent stdout was not captured"))?;

        let drain = tokio::spawn(drain_stdout(
            stdout,
            DrainTarget {
                raw_events: paths.raw_events.clone(),
                normalized_events: paths.normalized_events.clone(),
                run_id: run_id.to_string(),
            },
            accumulator.clone(),
        ));

        let waited = match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => Ok((exit_code_of(status), false)),
            Ok(Err(e)) => {
                // Kill so the pipe closes and the drain can finish.
                if let Err(kill_err) = child.start_kill() {
                    warn!(run_id, error = %kill_err, "failed to kill agent process after wait error");
                }
                Err(anyhow::Error::new(e)
                    .context(format!("waiting for agent process of run '{run_id}'")))
            }
            Err(_elapsed) => {
                warn!(run_id, timeout = ?self.timeout, "agent run timed out; killing process");
                if let Err(e) = child.start_kill() {
                    warn!(run_id, error = %e, "failed to kill timed-out agent process");
                }
                let code = match timeout(self.kill_grace, child.wait()).await {
                    Ok(Ok(status)) => exit_code_of(status),
                    Ok(Err(e)) => {
                        warn!(run_id, error = %e, "failed to reap killed agent process");
                        -1
                    }
                    Err(_) => {
                        warn!(run_id, grace = ?self.kill_grace, "killed agent process did not exit within grace period");
                        -1
                    }
                };
                Ok((code, true))
            }
        };

        // Every line is on disk before results are assembled or an error leaves.
        Ok(join_drain(waited, drain).await?)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_meta(
        &self,
        req: &ExecutionRequest,
        run_id: &str,
        paths: &RunPaths,
        invocation: &Invocation,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        exit_code: i32,
        timed_out: bool,
        summary: &crate::exec::drain::DrainSummary,
    ) -> RunMeta {
        RunMeta {
            run_id: run_id.to_string(),
            run_dir: paths.dir.clone(),
            argv: invocation.argv.clone(),
            cwd: req.workspace.clone(),
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
            exit_code,
            timed_out,
            session_id_before: req.session_id.clone(),
            session_id_after: summary.session_id.clone(),
            api_key_source: summary.api_key_source.clone(),
            permission_mode: req.agent.permission_mode.clone(),
            policy_preset: PolicyPreset::from_name(&req.agent.policy_preset).to_string(),
            model: req.agent.model.clone(),
        }
    }
}

/// `YYYYmmdd-HHMMSS-<6 hex>` in UTC; lexically ordered by creation second.
pub fn new_run_id() -> String {
    let suffix: [u8; 3] = rand::random();
    format!(
        "{}-{:02x}{:02x}{:02x}",
        Utc::now().format("%Y%m%d-%H%M%S"),
        suffix[0],
        suffix[1],
        suffix[2]
    )
}

fn resolve_run_location(req: &ExecutionRequest) -> (String, PathBuf) {
    match (&req.run_id, &req.run_dir) {
        (Some(id), Some(dir)) => (id.clone(), dir.clone()),
        (Some(id), None) => (id.clone(), workspace::run_dir(&req.workspace, id)),
        (None, Some(dir)) => {
            let id = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(new_run_id);
            (id, dir.clone())
        }
        (None, None) => {
            let id = new_run_id();
            let dir = workspace::run_dir(&req.workspace, &id);
            (id, dir)
        }
    }
}

fn read_optional_text(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(path = ?path, error = %e, "optional prompt file not readable; omitting");
            None
        }
    }
}

/// Exit code, or the negated signal number for a signal-terminated process.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
