// tests/config_loading.rs

mod common;
use crate::common::builders::ConfigFileBuilder;

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use agentrun::config::{ConfigFile, load_and_validate};
use agentrun::engine::ManagerSettings;
use agentrun::errors::AgentRunError;
use agentrun::tail::TailOptions;
use agentrun::types::LogLevel;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_file_yields_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.executor.program, "claude");
    assert_eq!(cfg.executor.timeout(), Duration::from_secs(600));
    assert_eq!(cfg.executor.lock_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.executor.kill_grace(), Duration::from_secs(30));
    assert_eq!(cfg.manager.lock_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.manager.policy_preset, "safe");
    assert_eq!(cfg.manager.permission_mode, "dontAsk");
    assert_eq!(cfg.tail.poll_interval(), Duration::from_millis(250));
    assert_eq!(cfg.tail.heartbeat(), Duration::from_secs(15));
    assert_eq!(cfg.logging.level, None);
}

#[test]
fn sections_override_defaults() {
    let file = write_config(
        r#"
[executor]
program = "/opt/agent/bin/claude"
timeout_secs = 120
repo_root = "/srv/repo"

[manager]
policy_preset = "dev"
model = "opus"

[tail]
poll_interval_ms = 100

[logging]
level = "debug"
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.executor.program, "/opt/agent/bin/claude");
    assert_eq!(cfg.executor.timeout_secs, 120);
    assert_eq!(cfg.executor.repo_root, std::path::PathBuf::from("/srv/repo"));
    assert_eq!(cfg.logging.level, Some(LogLevel::Debug));

    let settings = ManagerSettings::from_config(&cfg.manager);
    assert_eq!(settings.agent.policy_preset, "dev");
    assert_eq!(settings.agent.model.as_deref(), Some("opus"));
    assert_eq!(settings.agent.permission_mode, "dontAsk");

    let tail = TailOptions::from_config(&cfg.tail);
    assert_eq!(tail.poll_interval, Duration::from_millis(100));
}

#[test]
fn zero_timeout_is_rejected() {
    let file = write_config("[executor]\ntimeout_secs = 0\n");
    match load_and_validate(file.path()) {
        Err(AgentRunError::ConfigError(msg)) => {
            assert!(msg.contains("[executor].timeout_secs"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn empty_program_and_permission_mode_are_rejected() {
    let file = write_config("[executor]\nprogram = \"  \"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AgentRunError::ConfigError(msg)) if msg.contains("program")
    ));

    let file = write_config("[manager]\npermission_mode = \"\"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AgentRunError::ConfigError(msg)) if msg.contains("permission_mode")
    ));
}

#[test]
fn poll_interval_is_bounded() {
    let file = write_config("[tail]\npoll_interval_ms = 60001\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AgentRunError::ConfigError(_))
    ));
}

#[test]
fn unknown_preset_is_accepted_and_fails_closed_later() {
    let cfg = ConfigFileBuilder::new().policy_preset("whatever").build();
    assert_eq!(cfg.manager.policy_preset, "whatever");
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[executor\nprogram = 1");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AgentRunError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("agentrun.toml")),
        Err(AgentRunError::IoError(_))
    ));
}

#[test]
fn builder_defaults_match_config_default() {
    let built = ConfigFileBuilder::new().build();
    let default = ConfigFile::default();
    assert_eq!(built.executor.program, default.executor.program);
    assert_eq!(built.tail.poll_interval_ms, default.tail.poll_interval_ms);
}
