// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AgentRunError, Result};

const MAX_POLL_INTERVAL_MS: u64 = 60_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AgentRunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.executor,
            raw.manager,
            raw.tail,
            raw.logging,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_executor(cfg)?;
    validate_manager(cfg)?;
    validate_tail(cfg)?;
    Ok(())
}

fn ensure_positive(section: &str, field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(AgentRunError::ConfigError(format!(
            "[{section}].{field} must be >= 1 (got 0)"
        )));
    }
    Ok(())
}

fn ensure_non_empty(section: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AgentRunError::ConfigError(format!(
            "[{section}].{field} must not be empty"
        )));
    }
    Ok(())
}

fn validate_executor(cfg: &RawConfigFile) -> Result<()> {
    let ex = &cfg.executor;
    ensure_non_empty("executor", "program", &ex.program)?;
    ensure_positive("executor", "timeout_secs", ex.timeout_secs)?;
    ensure_positive("executor", "lock_timeout_secs", ex.lock_timeout_secs)?;
    ensure_positive("executor", "kill_grace_secs", ex.kill_grace_secs)?;
    Ok(())
}

fn validate_manager(cfg: &RawConfigFile) -> Result<()> {
    // policy_preset is deliberately not checked: unknown names resolve to
    // the read-only preset at invocation time.
    ensure_positive("manager", "lock_timeout_secs", cfg.manager.lock_timeout_secs)?;
    ensure_non_empty("manager", "permission_mode", &cfg.manager.permission_mode)?;
    Ok(())
}

fn validate_tail(cfg: &RawConfigFile) -> Result<()> {
    ensure_positive("tail", "poll_interval_ms", cfg.tail.poll_interval_ms)?;
    ensure_positive("tail", "heartbeat_secs", cfg.tail.heartbeat_secs)?;

    if cfg.tail.poll_interval_ms > MAX_POLL_INTERVAL_MS {
        return Err(AgentRunError::ConfigError(format!(
            "[tail].poll_interval_ms must be <= {MAX_POLL_INTERVAL_MS} (got {})",
            cfg.tail.poll_interval_ms
        )));
    }
    Ok(())
}
