// src/config/agent.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-run agent settings.
///
/// Built by the caller; agentrun never loads these from declarative files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Optional `--model` override.
    #[serde(default)]
    pub model: Option<String>,

    /// Passed through to `--permission-mode`.
    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,

    /// `"safe"`, `"dev"` or `"open"`; resolved by [`crate::PolicyPreset::from_name`].
    #[serde(default = "default_policy_preset")]
    pub policy_preset: String,

    /// File whose contents become `--system-prompt`. Missing files are skipped.
    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,

    /// File whose contents become `--append-system-prompt`. Missing files are skipped.
    #[serde(default)]
    pub append_system_prompt_path: Option<PathBuf>,

    /// Extra directories the agent may access (repeated `--add-dir`).
    #[serde(default)]
    pub add_dirs: Vec<PathBuf>,
}

fn default_permission_mode() -> String {
    "dontAsk".to_string()
}

fn default_policy_preset() -> String {
    "safe".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            permission_mode: default_permission_mode(),
            policy_preset: default_policy_preset(),
            system_prompt_path: None,
            append_system_prompt_path: None,
            add_dirs: Vec::new(),
        }
    }
}
