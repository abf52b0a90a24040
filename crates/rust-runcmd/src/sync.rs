//! Blocking wrappers for callers without an async runtime.
//!
//! Every function builds a current-thread tokio runtime for the duration of
//! the run. Calling them from inside a tokio runtime panics; use the async
//! functions there.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::runtime::Builder;

use crate::command::Command;
use crate::error::{Result, RunError};
use crate::qa::QaSpec;
use crate::run::{RunOptions, Runner};
use crate::shortcuts;
use crate::types::RunResult;

fn block_on<F: Future<Output = Result<RunResult>>>(future: F) -> Result<RunResult> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| RunError::io_context("creating tokio runtime", e))?;
    runtime.block_on(future)
}

/// Blocking [`run`](crate::run).
pub fn run(command: impl Into<Command>, options: RunOptions) -> Result<RunResult> {
    block_on(crate::run::run(command, options))
}

/// A [`Runner`] driven by its own runtime.
#[derive(Debug)]
pub struct SyncRunner {
    runtime: tokio::runtime::Runtime,
    inner: Runner,
}

impl SyncRunner {
    /// Validate `options` and build the runtime.
    pub fn new(options: RunOptions) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RunError::io_context("creating tokio runtime", e))?;
        Ok(Self {
            runtime,
            inner: Runner::new(options)?,
        })
    }

    /// Run `command` once.
    pub fn run(&self, command: impl Into<Command>) -> Result<RunResult> {
        self.runtime.block_on(self.inner.run(&command.into()))
    }
}

/// Blocking [`shortcuts::run_simple`].
pub fn run_simple(command: impl Into<Command>) -> Result<RunResult> {
    block_on(shortcuts::run_simple(command))
}

/// Blocking [`shortcuts::run_nocheck`].
pub fn run_nocheck(command: impl Into<Command>) -> Result<RunResult> {
    block_on(shortcuts::run_nocheck(command))
}

/// Blocking [`shortcuts::run_loop_log`].
pub fn run_loop_log(command: impl Into<Command>) -> Result<RunResult> {
    block_on(shortcuts::run_loop_log(command))
}

/// Blocking [`shortcuts::run_to_stdout`].
pub fn run_to_stdout(command: impl Into<Command>) -> Result<RunResult> {
    block_on(shortcuts::run_to_stdout(command))
}

/// Blocking [`shortcuts::run_async`].
pub fn run_async(command: impl Into<Command>) -> Result<RunResult> {
    block_on(shortcuts::run_async(command))
}

/// Blocking [`shortcuts::run_timeout`].
pub fn run_timeout(command: impl Into<Command>, timeout: Duration) -> Result<RunResult> {
    block_on(shortcuts::run_timeout(command, timeout))
}

/// Blocking [`shortcuts::run_file`].
pub fn run_file(command: impl Into<Command>, path: impl Into<PathBuf>) -> Result<RunResult> {
    block_on(shortcuts::run_file(command, path))
}

/// Blocking [`shortcuts::run_pty`].
pub fn run_pty(command: impl Into<Command>) -> Result<RunResult> {
    block_on(shortcuts::run_pty(command))
}

/// Blocking [`shortcuts::run_qa`].
pub fn run_qa(command: impl Into<Command>, qa: QaSpec) -> Result<RunResult> {
    block_on(shortcuts::run_qa(command, qa))
}

/// Blocking [`shortcuts::run_qa_log`].
pub fn run_qa_log(command: impl Into<Command>, qa: QaSpec) -> Result<RunResult> {
    block_on(shortcuts::run_qa_log(command, qa))
}

/// Blocking [`shortcuts::run_qa_stdout`].
pub fn run_qa_stdout(command: impl Into<Command>, qa: QaSpec) -> Result<RunResult> {
    block_on(shortcuts::run_qa_stdout(command, qa))
}
