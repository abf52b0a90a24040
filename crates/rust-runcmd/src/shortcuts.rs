//! One-call run variants.
//!
//! Each function runs one command with a preset [`RunOptions`] built from
//! `RUNCMD_*` environment configuration. Use [`run`] directly for anything
//! else.

use std::path::PathBuf;
use std::time::Duration;

use crate::command::Command;
use crate::error::Result;
use crate::launch::Backend;
use crate::qa::QaSpec;
use crate::run::{OutputEcho, RunOptions, run};
use crate::types::RunResult;
use crate::wait::WaitStrategy;

/// Run to completion and collect the output.
pub async fn run_simple(command: impl Into<Command>) -> Result<RunResult> {
    run(command, RunOptions::from_env()).await
}

/// Like [`run_simple`], but a non-zero exit is only logged at debug level.
pub async fn run_nocheck(command: impl Into<Command>) -> Result<RunResult> {
    run(command, RunOptions::from_env().no_worries()).await
}

/// Poll the child and log its output as it arrives.
pub async fn run_loop_log(command: impl Into<Command>) -> Result<RunResult> {
    run(command, RunOptions::from_env().echo(OutputEcho::Log)).await
}

/// Poll the child and copy its output to stdout as it arrives.
pub async fn run_to_stdout(command: impl Into<Command>) -> Result<RunResult> {
    run(command, RunOptions::from_env().echo(OutputEcho::Stdout)).await
}

/// Poll the child with non-blocking reads.
pub async fn run_async(command: impl Into<Command>) -> Result<RunResult> {
    let options = RunOptions::from_env()
        .backend(Backend::AsyncPipe)
        .wait(WaitStrategy::Loop);
    run(command, options).await
}

/// Poll the child, killing it once `timeout` has passed.
pub async fn run_timeout(command: impl Into<Command>, timeout: Duration) -> Result<RunResult> {
    run(command, RunOptions::from_env().timeout(timeout)).await
}

/// Redirect stdout and stderr to `path`. The returned output is empty.
pub async fn run_file(command: impl Into<Command>, path: impl Into<PathBuf>) -> Result<RunResult> {
    run(command, RunOptions::from_env().backend(Backend::File(path.into()))).await
}

/// Attach the child to a pseudo-terminal. The returned output is empty.
pub async fn run_pty(command: impl Into<Command>) -> Result<RunResult> {
    run(command, RunOptions::from_env().backend(Backend::Pty)).await
}

/// Answer the child's questions.
pub async fn run_qa(command: impl Into<Command>, qa: QaSpec) -> Result<RunResult> {
    run(command, RunOptions::from_env().qa(qa)).await
}

/// Answer the child's questions, logging its output.
pub async fn run_qa_log(command: impl Into<Command>, qa: QaSpec) -> Result<RunResult> {
    run(command, RunOptions::from_env().qa(qa).echo(OutputEcho::Log)).await
}

/// Answer the child's questions, copying its output to stdout.
pub async fn run_qa_stdout(command: impl Into<Command>, qa: QaSpec) -> Result<RunResult> {
    run(command, RunOptions::from_env().qa(qa).echo(OutputEcho::Stdout)).await
}
