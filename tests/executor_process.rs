// tests/executor_process.rs
#![cfg(unix)]

mod common;
use crate::common::builders::AgentConfigBuilder;
use crate::common::{TestWorkspace, init_tracing, with_timeout};

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};

use agentrun::errors::AgentRunError;
use agentrun::exec::{ExecutionRequest, ProcessExecutor, new_run_id};
use agentrun::workspace::{WorkspaceLock, artifacts};
use agentrun_test_utils::fake_agent::{FakeAgent, FakeRun};

fn executor(agent: &FakeAgent, repo_root: &Path) -> ProcessExecutor {
    ProcessExecutor::default()
        .with_program(agent.program_str())
        .with_repo_root(repo_root)
        .with_timeout(Duration::from_secs(5))
        .with_lock_timeout(Duration::from_secs(2))
        .with_kill_grace(Duration::from_secs(2))
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn result_text_overrides_deltas_and_all_artifacts_exist() {
    init_tracing();
    let ws = TestWorkspace::new();
    let bin = tempfile::tempdir().unwrap();
    let agent = FakeAgent::install(bin.path()).unwrap();

    FakeRun::new()
        .json(json!({"type": "init", "session_id": "sid-123", "apiKeySource": "env"}))
        .json(json!({"type": "delta", "delta": "hello"}))
        .json(json!({"type": "result", "session_id": "sid-123", "result_text": "OK", "usage": {}}))
        .configure(ws.path())
        .unwrap();

    let req = ExecutionRequest::new("say hello", ws.path()).with_run_id("run-1");
    let result = with_timeout(executor(&agent, bin.path()).execute(req))
        .await
        .unwrap();

    assert_eq!(result.run_id, "run-1");
    assert_eq!(result.run_dir, ws.run_dir("run-1"));
    assert_eq!(result.exit_code, 0);
    assert!(!result.timed_out);
    assert_eq!(result.final_text, "OK");
    assert_eq!(result.session_id_before, None);
    assert_eq!(result.session_id_after.as_deref(), Some("sid-123"));
    assert_eq!(result.api_key_source.as_deref(), Some("env"));

    // The manager writes status.json; everything else is the executor's.
    for name in artifacts::ALL.iter().filter(|n| **n != artifacts::STATUS) {
        assert!(result.run_dir.join(name).exists(), "missing {name}");
    }

    let raw = read_lines(&result.run_dir.join(artifacts::RAW_EVENTS));
    let norm = read_lines(&result.run_dir.join(artifacts::NORMALIZED_EVENTS));
    assert_eq!(raw.len(), 3);
    assert_eq!(norm.len(), raw.len());

    let kinds: Vec<String> = norm
        .iter()
        .map(|l| serde_json::from_str::<Value>(l).unwrap()["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["init", "delta", "result"]);

    assert_eq!(fs::read_to_string(result.run_dir.join(artifacts::RESULT)).unwrap(), "OK");

    let step = read_json(&result.run_dir.join(artifacts::STEP));
    assert_eq!(step["instruction"], "say hello");
    assert_eq!(step["session_id_after"], "sid-123");
    assert_eq!(step["fork"], false);
    assert_eq!(step["exit_code"], 0);

    let meta = read_json(&result.run_dir.join(artifacts::META));
    assert_eq!(meta["run_id"], "run-1");
    assert_eq!(meta["apiKeySource"], "env");
    assert_eq!(meta["policy_preset"], "safe");
    assert_eq!(meta["permission_mode"], "dontAsk");
    assert_eq!(meta["timed_out"], false);
    assert_eq!(meta["argv"][0], json!(agent.program_str()));

    let stderr = fs::read_to_string(result.run_dir.join(artifacts::STDERR)).unwrap();
    assert!(stderr.contains("fake agent"));
}

#[tokio::test]
async fn deltas_concatenate_without_result_and_bad_lines_are_recorded() {
    init_tracing();
    let ws = TestWorkspace::new();
    let bin = tempfile::tempdir().unwrap();
    let agent = FakeAgent::install(bin.path()).unwrap();

    FakeRun::new()
        .json(json!({"type": "delta", "delta": "hel"}))
        .line("not-json")
        .line("")
        .json(json!({"delta": {"text": "lo"}}))
        .configure(ws.path())
        .unwrap();

    let req = ExecutionRequest::new("greet", ws.path())
        .with_session_id(Some("sid-old".to_string()))
        .with_run_id("run-2");
    let result = with_timeout(executor(&agent, bin.path()).execute(req))
        .await
        .unwrap();

    assert_eq!(result.final_text, "hello");
    // No new token observed: the old one carries over.
    assert_eq!(result.session_id_before.as_deref(), Some("sid-old"));
    assert_eq!(result.session_id_after.as_deref(), Some("sid-old"));

    let raw = read_lines(&result.run_dir.join(artifacts::RAW_EVENTS));
    let norm = read_lines(&result.run_dir.join(artifacts::NORMALIZED_EVENTS));
    assert_eq!(raw, vec![
        json!({"type": "delta", "delta": "hel"}).to_string(),
        "not-json".to_string(),
        json!({"delta": {"text": "lo"}}).to_string(),
    ]);
    assert_eq!(norm.len(), 3);

    let marker: Value = serde_json::from_str(&norm[1]).unwrap();
    assert_eq!(marker["kind"], "parse_error");
    assert_eq!(marker["raw"], "not-json");
    assert!(marker["error"].as_str().unwrap().starts_with("json_decode_error:"));
}

#[tokio::test]
async fn invocation_resumes_session_and_grants_workspace_dirs() {
    init_tracing();
    let ws = TestWorkspace::new();
    let bin = tempfile::tempdir().unwrap();
    let agent = FakeAgent::install(bin.path()).unwrap();
    let files = FakeRun::new().configure(ws.path()).unwrap();

    let prompt_file = ws.path().join("system.md");
    fs::write(&prompt_file, "You are terse.").unwrap();

    let cfg = AgentConfigBuilder::new()
        .policy_preset("dev")
        .system_prompt_path(&prompt_file)
        .append_system_prompt_path(ws.path().join("missing.md"))
        .add_dir("/extra")
        .build();
    let req = ExecutionRequest::new("do it", ws.path())
        .with_agent(cfg)
        .with_session_id(Some("sid-7".to_string()))
        .with_fork(true);
    let result = with_timeout(executor(&agent, bin.path()).execute(req))
        .await
        .unwrap();

    assert_eq!(files.calls(), 1);
    let args = files.args();
    let ws_str = ws.path().display().to_string();
    let kb_str = ws.path().join("kb").display().to_string();
    let root_str = bin.path().display().to_string();

    let add_dirs: Vec<&str> = args
        .windows(2)
        .filter(|w| w[0] == "--add-dir")
        .map(|w| w[1].as_str())
        .collect();
    assert_eq!(add_dirs, vec![ws_str.as_str(), kb_str.as_str(), root_str.as_str(), "/extra"]);

    assert!(args.windows(3).any(|w| w == ["--resume", "sid-7", "--fork-session"]));
    assert!(args.windows(2).any(|w| w == ["--system-prompt", "You are terse."]));
    assert!(!args.iter().any(|a| a == "--append-system-prompt"));
    assert_eq!(args.last().map(String::as_str), Some("do it"));

    // Generated identifier, default run directory.
    assert_eq!(result.run_dir, ws.run_dir(&result.run_id));
    let parts: Vec<&str> = result.run_id.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].len(), 8);
    assert_eq!(parts[1].len(), 6);
    assert_eq!(parts[2].len(), 6);
}

#[tokio::test]
async fn timeout_kills_process_and_is_an_outcome() {
    init_tracing();
    let ws = TestWorkspace::new();
    let bin = tempfile::tempdir().unwrap();
    let agent = FakeAgent::install(bin.path()).unwrap();

    FakeRun::new()
        .json(json!({"type": "delta", "delta": "partial"}))
        .sleep_secs(30)
        .configure(ws.path())
        .unwrap();

    let exec = executor(&agent, bin.path()).with_timeout(Duration::from_millis(500));
    let req = ExecutionRequest::new("hang", ws.path()).with_run_id("run-slow");
    let result = with_timeout(exec.execute(req)).await.unwrap();

    assert!(result.timed_out);
    assert_eq!(result.exit_code, -9);
    assert_eq!(result.final_text, "partial");

    let step = read_json(&result.run_dir.join(artifacts::STEP));
    assert_eq!(step["timed_out"], true);
    assert_eq!(read_lines(&result.run_dir.join(artifacts::RAW_EVENTS)).len(), 1);
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_raised() {
    let ws = TestWorkspace::new();
    let bin = tempfile::tempdir().unwrap();
    let agent = FakeAgent::install(bin.path()).unwrap();
    FakeRun::new().exit_code(3).configure(ws.path()).unwrap();

    let req = ExecutionRequest::new("fail", ws.path()).with_run_id("run-3");
    let result = with_timeout(executor(&agent, bin.path()).execute(req))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert_eq!(result.final_text, "");
    assert!(ws.run_dir("run-3").join(artifacts::RESULT).exists());
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() {
    let ws = TestWorkspace::new();
    let exec = ProcessExecutor::default()
        .with_program("/nonexistent/agentrun-no-such-agent")
        .with_lock_timeout(Duration::from_secs(1));

    let err = exec
        .execute(ExecutionRequest::new("x", ws.path()).with_run_id("run-x"))
        .await
        .unwrap_err();
    match err {
        AgentRunError::SpawnFailed { program, .. } => {
            assert_eq!(program, "/nonexistent/agentrun-no-such-agent");
        }
        other => panic!("expected SpawnFailed, got {other:?}"),
    }

    // The lock is not left behind.
    WorkspaceLock::acquire(ws.path(), Duration::from_millis(100))
        .await
        .expect("lock free after spawn failure");
}

#[tokio::test]
async fn busy_workspace_times_out_before_spawning() {
    let ws = TestWorkspace::new();
    let bin = tempfile::tempdir().unwrap();
    let agent = FakeAgent::install(bin.path()).unwrap();
    let files = FakeRun::new().configure(ws.path()).unwrap();

    let _held = WorkspaceLock::acquire(ws.path(), Duration::from_secs(1))
        .await
        .unwrap();

    let exec = executor(&agent, bin.path()).with_lock_timeout(Duration::from_millis(200));
    let err = exec
        .execute(ExecutionRequest::new("x", ws.path()).with_run_id("run-busy"))
        .await
        .unwrap_err();

    assert!(err.is_lock_timeout());
    assert_eq!(files.calls(), 0);
}

#[test]
fn run_ids_are_time_ordered() {
    let id = new_run_id();
    assert_eq!(id.len(), "20240101-120000-abcdef".len());
    assert!(id[16..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert!(new_run_id()[..15] >= id[..15]);
}
