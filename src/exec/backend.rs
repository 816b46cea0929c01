// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The run manager talks to an `ExecutionBackend` instead of calling
//! [`ProcessExecutor`] directly. This makes it easy to swap in a fake backend
//! in tests while keeping the production implementation in [`executor`].
//!
//! [`executor`]: super::executor

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

use super::executor::{ExecutionRequest, ExecutionResult, ProcessExecutor};

/// Trait abstracting how one agent run is executed.
///
/// Production code uses [`ProcessExecutor`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutionBackend: Send + Sync {
    /// Execute one request to completion.
    ///
    /// The implementation is free to:
    /// - spawn the agent CLI and persist run artifacts (production)
    /// - record the request and return a canned result (tests)
    fn execute(
        &self,
        req: ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + '_>>;
}

impl ExecutionBackend for ProcessExecutor {
    fn execute(
        &self,
        req: ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + '_>> {
        Box::pin(ProcessExecutor::execute(self, req))
    }
}
