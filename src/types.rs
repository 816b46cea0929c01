// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named capability bundle granted to the agent for one run.
///
/// - `Safe`: read-only discovery tools.
/// - `Dev`: adds editing, writing and shell access.
/// - `Open`: adds outbound network tools on top of `Dev`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    #[default]
    Safe,
    Dev,
    Open,
}

impl PolicyPreset {
    /// Resolve a preset by name, case-insensitively.
    ///
    /// Unknown names resolve to `Safe`: a typo must never widen what the
    /// agent is allowed to do.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(PolicyPreset::Safe)
    }

    /// Comma-separated tool allow-list for this preset.
    pub fn tools(self) -> &'static str {
        match self {
            PolicyPreset::Safe => "Read,Grep,Glob",
            PolicyPreset::Dev => "Bash,Edit,Write,Read,Grep,Glob",
            PolicyPreset::Open => "Bash,Edit,Write,Read,Grep,Glob,WebFetch,WebSearch",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyPreset::Safe => "safe",
            PolicyPreset::Dev => "dev",
            PolicyPreset::Open => "open",
        }
    }
}

impl FromStr for PolicyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" => Ok(PolicyPreset::Safe),
            "dev" => Ok(PolicyPreset::Dev),
            "open" => Ok(PolicyPreset::Open),
            other => Err(format!(
                "invalid policy preset: {other} (expected \"safe\", \"dev\" or \"open\")"
            )),
        }
    }
}

impl fmt::Display for PolicyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a run as persisted in its status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    /// Parse the `state` string of a status document; unknown values are `None`.
    pub fn from_status_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunState::Running),
            "completed" => Some(RunState::Completed),
            "failed" => Some(RunState::Failed),
            _ => None,
        }
    }
}

/// Log level accepted in the `[logging]` config section.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
