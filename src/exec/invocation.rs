// src/exec/invocation.rs

//! Pure mapping from run inputs to the agent's argument vector.

use std::path::PathBuf;

use crate::config::AgentConfig;
use crate::types::PolicyPreset;

/// Inputs to [`build_invocation`].
#[derive(Debug, Clone)]
pub struct InvocationSpec<'a> {
    pub program: &'a str,
    pub prompt: &'a str,
    pub agent: &'a AgentConfig,
    /// Session token to resume, if any.
    pub resume: Option<&'a str>,
    /// Fork the resumed session instead of continuing it. Ignored without `resume`.
    pub fork: bool,
    pub add_dirs: &'a [PathBuf],
    pub system_prompt: Option<&'a str>,
    pub append_system_prompt: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Full argument vector; `argv[0]` is the program.
    pub argv: Vec<String>,
    pub prompt: String,
}

impl Invocation {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

/// Build the argument vector. Performs no I/O and no path validation.
///
/// Order: program, output flags, permission mode, tool allow-list, model,
/// resume (+ fork), `--add-dir`s, system prompts, then the prompt as the
/// final positional argument.
pub fn build_invocation(spec: &InvocationSpec<'_>) -> Invocation {
    let preset = PolicyPreset::from_name(&spec.agent.policy_preset);

    let mut argv: Vec<String> = vec![
        spec.program.to_string(),
        "-p".to_string(),
        "--verbose".to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--permission-mode".to_string(),
        spec.agent.permission_mode.clone(),
        "--tools".to_string(),
        preset.tools().to_string(),
    ];

    if let Some(model) = spec.agent.model.as_deref().filter(|m| !m.is_empty()) {
        argv.extend(["--model".to_string(), model.to_string()]);
    }

    if let Some(resume) = spec.resume.filter(|s| !s.is_empty()) {
        argv.extend(["--resume".to_string(), resume.to_string()]);
        if spec.fork {
            argv.push("--fork-session".to_string());
        }
    }

    for dir in spec.add_dirs {
        argv.extend(["--add-dir".to_string(), dir.display().to_string()]);
    }

    if let Some(prompt) = spec.system_prompt.filter(|s| !s.is_empty()) {
        argv.extend(["--system-prompt".to_string(), prompt.to_string()]);
    }

    if let Some(prompt) = spec.append_system_prompt.filter(|s| !s.is_empty()) {
        argv.extend(["--append-system-prompt".to_string(), prompt.to_string()]);
    }

    argv.push(spec.prompt.to_string());

    Invocation {
        argv,
        prompt: spec.prompt.to_string(),
    }
}
