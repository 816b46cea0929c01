// src/workspace/records.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RunState;

/// One line of `messages.ndjson`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl Message {
    /// The message recorded for a finished run: `asst-<run_id>`.
    pub fn assistant_for_run(run_id: &str, content: impl Into<String>) -> Self {
        Self {
            message_id: format!("asst-{run_id}"),
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            run_id: Some(run_id.to_string()),
        }
    }

    pub fn user(message_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            run_id: None,
        }
    }
}

/// Contents of `session.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Continuation token issued by the agent; `None` until the first run
    /// reports one.
    #[serde(default, rename = "claude_session_id", alias = "session_id")]
    pub session_id: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_id: Option<String>,
}

/// Contents of `runs/<run_id>/status.json`.
///
/// Transitions strictly `running -> completed | failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl RunStatus {
    pub fn running(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            state: RunState::Running,
            started_at,
            finished_at: None,
            exit_code: None,
            timed_out: None,
            session_id_after: None,
            error: None,
            trace: None,
        }
    }

    pub fn completed(
        run_id: impl Into<String>,
        started_at: DateTime<Utc>,
        exit_code: i32,
        timed_out: bool,
        session_id_after: Option<String>,
    ) -> Self {
        Self {
            state: RunState::Completed,
            finished_at: Some(Utc::now()),
            exit_code: Some(exit_code),
            timed_out: Some(timed_out),
            session_id_after,
            ..Self::running(run_id, started_at)
        }
    }

    pub fn failed(
        run_id: impl Into<String>,
        started_at: DateTime<Utc>,
        error: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        Self {
            state: RunState::Failed,
            finished_at: Some(Utc::now()),
            error: Some(error.into()),
            trace: Some(trace.into()),
            ..Self::running(run_id, started_at)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
