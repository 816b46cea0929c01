// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::agent::AgentConfig;
use crate::types::{LogLevel, PolicyPreset};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [executor]
/// program = "claude"
/// timeout_secs = 600
///
/// [manager]
/// policy_preset = "dev"
///
/// [tail]
/// poll_interval_ms = 250
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub manager: ManagerSection,

    #[serde(default)]
    pub tail: TailSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// (see `validate.rs`) or [`ConfigFile::new_unchecked`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub executor: ExecutorSection,
    pub manager: ManagerSection,
    pub tail: TailSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    pub fn new_unchecked(
        executor: ExecutorSection,
        manager: ManagerSection,
        tail: TailSection,
        logging: LoggingSection,
    ) -> Self {
        Self {
            executor,
            manager,
            tail,
            logging,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.executor, raw.manager, raw.tail, raw.logging)
    }
}

/// `[executor]` section: how the agent process is spawned and supervised.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    /// Agent executable, resolved through `PATH` when not absolute.
    #[serde(default = "default_program")]
    pub program: String,

    /// Wall-clock budget for one agent process before it is killed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long the executor waits for the workspace lock before spawning.
    #[serde(default = "default_executor_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// How long to wait for the process to be reaped after a forced kill.
    #[serde(default = "default_kill_grace_secs")]
    pub kill_grace_secs: u64,

    /// Repository root granted to the agent as an extra directory.
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,
}

fn default_program() -> String {
    "claude".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_executor_lock_timeout_secs() -> u64 {
    30
}

fn default_kill_grace_secs() -> u64 {
    30
}

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
            lock_timeout_secs: default_executor_lock_timeout_secs(),
            kill_grace_secs: default_kill_grace_secs(),
            repo_root: default_repo_root(),
        }
    }
}

impl ExecutorSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

/// `[manager]` section: the fixed run configuration used for every run the
/// run manager starts.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerSection {
    #[serde(default = "default_manager_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// `"safe"`, `"dev"` or `"open"`. Anything else behaves like `"safe"`.
    #[serde(default = "default_policy_preset")]
    pub policy_preset: String,

    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,

    #[serde(default)]
    pub model: Option<String>,
}

fn default_manager_lock_timeout_secs() -> u64 {
    10
}

fn default_policy_preset() -> String {
    PolicyPreset::Safe.as_str().to_string()
}

fn default_permission_mode() -> String {
    "dontAsk".to_string()
}

impl Default for ManagerSection {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_manager_lock_timeout_secs(),
            policy_preset: default_policy_preset(),
            permission_mode: default_permission_mode(),
            model: None,
        }
    }
}

impl ManagerSection {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Agent settings applied to every run started by the manager.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            policy_preset: self.policy_preset.clone(),
            permission_mode: self.permission_mode.clone(),
            model: self.model.clone(),
            ..AgentConfig::default()
        }
    }
}

/// `[tail]` section: live event feed polling.
#[derive(Debug, Clone, Deserialize)]
pub struct TailSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Idle time without data frames after which a keepalive comment is sent.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_heartbeat_secs() -> u64 {
    15
}

impl Default for TailSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

impl TailSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// If `None`, `AGENTRUN_LOG` or `info` is used.
    #[serde(default)]
    pub level: Option<LogLevel>,
}
