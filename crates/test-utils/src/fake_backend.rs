use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentrun::errors::{AgentRunError, Result};
use agentrun::exec::{ExecutionBackend, ExecutionRequest, ExecutionResult};
use agentrun::workspace;

/// A fake execution backend that:
/// - records every request it receives
/// - optionally sleeps to simulate a long-running agent
/// - returns a canned result (or a canned failure or panic) without spawning anything.
#[derive(Clone)]
pub struct FakeBackend {
    requests: Arc<Mutex<Vec<ExecutionRequest>>>,
    delay: Duration,
    final_text: String,
    session_id_after: Option<String>,
    failure: Option<String>,
    panic: Option<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
            final_text: "OK".to_string(),
            session_id_after: Some("sid-fake".to_string()),
            failure: None,
            panic: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_final_text(mut self, text: &str) -> Self {
        self.final_text = text.to_string();
        self
    }

    pub fn with_session_id_after(mut self, sid: Option<&str>) -> Self {
        self.session_id_after = sid.map(str::to_string);
        self
    }

    /// Every execution fails with this message.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Every execution panics with this message instead of returning.
    pub fn panicking(mut self, message: &str) -> Self {
        self.panic = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionBackend for FakeBackend {
    fn execute(
        &self,
        req: ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + '_>> {
        Box::pin(async move {
            {
                let mut guard = self.requests.lock().unwrap();
                guard.push(req.clone());
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if let Some(msg) = &self.panic {
                panic!("{msg}");
            }

            if let Some(msg) = &self.failure {
                return Err(AgentRunError::Other(anyhow::anyhow!(msg.clone())));
            }

            let run_id = req.run_id.clone().unwrap_or_else(|| "fake-run".to_string());
            Ok(ExecutionResult {
                run_dir: workspace::run_dir(&req.workspace, &run_id),
                run_id,
                exit_code: 0,
                timed_out: false,
                session_id_before: req.session_id.clone(),
                session_id_after: self.session_id_after.clone(),
                api_key_source: None,
                final_text: self.final_text.clone(),
            })
        })
    }
}
