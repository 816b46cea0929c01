//! A scripted stand-in for the agent CLI.
//!
//! The script reads its behaviour from variables the executor merges in from
//! the workspace `.env`, so one installed script serves every test workspace.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde_json::Value;

const SCRIPT: &str = r#"#!/bin/sh
if [ -n "$FAKE_AGENT_CALLS" ]; then echo call >> "$FAKE_AGENT_CALLS"; fi
if [ -n "$FAKE_AGENT_ARGS" ]; then printf '%s\n' "$@" > "$FAKE_AGENT_ARGS"; fi
if [ -n "$FAKE_AGENT_OUTPUT" ]; then cat "$FAKE_AGENT_OUTPUT"; fi
echo "fake agent: $# args" >&2
if [ -n "$FAKE_AGENT_SLEEP" ]; then exec sleep "$FAKE_AGENT_SLEEP"; fi
exit "${FAKE_AGENT_EXIT:-0}"
"#;

const FAKE_DIR: &str = ".fake-agent";

/// An installed fake agent executable.
pub struct FakeAgent {
    program: PathBuf,
}

impl FakeAgent {
    /// Write the script into `dir` and mark it executable.
    pub fn install(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let program = dir.join("fake-agent");
        fs::write(&program, SCRIPT)?;
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755))?;
        Ok(Self { program })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn program_str(&self) -> String {
        self.program.display().to_string()
    }
}

/// What the fake agent does when run inside one workspace.
#[derive(Debug, Clone, Default)]
pub struct FakeRun {
    stdout: Vec<String>,
    sleep_secs: Option<u64>,
    exit_code: i32,
}

impl FakeRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `line` verbatim on stdout.
    pub fn line(mut self, line: &str) -> Self {
        self.stdout.push(line.to_string());
        self
    }

    /// Emit `value` as one compact JSON line.
    pub fn json(mut self, value: Value) -> Self {
        self.stdout.push(value.to_string());
        self
    }

    /// Sleep after writing stdout; the process is replaced by `sleep`, so a
    /// kill ends it immediately.
    pub fn sleep_secs(mut self, secs: u64) -> Self {
        self.sleep_secs = Some(secs);
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Write the stdout fixture and the `.env` that points the script at it.
    pub fn configure(&self, workspace: &Path) -> io::Result<FakeRunFiles> {
        let dir = workspace.join(FAKE_DIR);
        fs::create_dir_all(&dir)?;

        let files = FakeRunFiles {
            output: dir.join("stdout.ndjson"),
            calls: dir.join("calls"),
            args: dir.join("args"),
        };

        let mut stdout = self.stdout.join("\n");
        if !stdout.is_empty() {
            stdout.push('\n');
        }
        fs::write(&files.output, stdout)?;

        let mut env = format!(
            "FAKE_AGENT_OUTPUT=\"{}\"\nFAKE_AGENT_CALLS=\"{}\"\nFAKE_AGENT_ARGS=\"{}\"\nFAKE_AGENT_EXIT={}\n",
            files.output.display(),
            files.calls.display(),
            files.args.display(),
            self.exit_code,
        );
        if let Some(secs) = self.sleep_secs {
            env.push_str(&format!("FAKE_AGENT_SLEEP={secs}\n"));
        }
        fs::write(workspace.join(".env"), env)?;

        Ok(files)
    }
}

/// Files the fake agent reads from and writes to.
#[derive(Debug, Clone)]
pub struct FakeRunFiles {
    pub output: PathBuf,
    pub calls: PathBuf,
    pub args: PathBuf,
}

impl FakeRunFiles {
    /// How many times the script has been started.
    pub fn calls(&self) -> usize {
        fs::read_to_string(&self.calls)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// Arguments of the most recent invocation, one per element.
    pub fn args(&self) -> Vec<String> {
        fs::read_to_string(&self.args)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
