#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub use agentrun_test_utils::{init_tracing, with_timeout};
pub use agentrun_test_utils::builders;

/// A scratch workspace with its `kb/` and `runs/` directories in place.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp workspace");
        agentrun::workspace::ensure_layout(dir.path()).expect("create workspace layout");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        agentrun::workspace::run_dir(self.path(), run_id)
    }
}
