#![allow(dead_code)]

use std::path::PathBuf;

use agentrun::config::{AgentConfig, ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.executor.program = program.into();
        self
    }

    pub fn repo_root(mut self, repo_root: impl Into<PathBuf>) -> Self {
        self.config.executor.repo_root = repo_root.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.executor.timeout_secs = secs;
        self
    }

    pub fn kill_grace_secs(mut self, secs: u64) -> Self {
        self.config.executor.kill_grace_secs = secs;
        self
    }

    pub fn policy_preset(mut self, preset: &str) -> Self {
        self.config.manager.policy_preset = preset.to_string();
        self
    }

    pub fn manager_lock_timeout_secs(mut self, secs: u64) -> Self {
        self.config.manager.lock_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.tail.poll_interval_ms = ms;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `AgentConfig`.
pub struct AgentConfigBuilder {
    agent: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn new() -> Self {
        Self {
            agent: AgentConfig::default(),
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.agent.model = Some(model.to_string());
        self
    }

    pub fn permission_mode(mut self, mode: &str) -> Self {
        self.agent.permission_mode = mode.to_string();
        self
    }

    pub fn policy_preset(mut self, preset: &str) -> Self {
        self.agent.policy_preset = preset.to_string();
        self
    }

    pub fn system_prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent.system_prompt_path = Some(path.into());
        self
    }

    pub fn append_system_prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent.append_system_prompt_path = Some(path.into());
        self
    }

    pub fn add_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.agent.add_dirs.push(dir.into());
        self
    }

    pub fn build(self) -> AgentConfig {
        self.agent
    }
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
