//! Wait strategies.
//!
//! A wait strategy drives time for one spawned child: it decides when to
//! read, when to sleep, and when the run is over.

use std::fmt;
use std::time::Duration;

use crate::config::LoopConfig;
use crate::deadline::{Deadline, nap};
use crate::error::Result;
use crate::handler::{ChunkHandler, LoopAction};
use crate::launch::ProcessHandle;
use crate::reader::OutputReader;
use crate::types::{QA_ABANDONED_EXIT_CODE, RunResult, exit_code_of};

/// How the driver waits for the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Block until exit, then read all output at once.
    Simple,
    /// Poll at an interval and hand each chunk to a handler.
    Loop,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Loop => write!(f, "loop"),
        }
    }
}

/// How long the final read of a non-blocking pipe waits for output.
const FINAL_SETTLE: Duration = Duration::from_millis(50);

/// States of the loop strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Reading and handling chunks.
    Running,
    /// A handler asked to stop; the process group is being killed.
    Stopping,
}

/// Wait for exit, then collect everything the child wrote.
pub async fn wait_simple(
    process: &mut ProcessHandle,
    reader: &mut OutputReader,
) -> Result<RunResult> {
    let (status, output) = tokio::join!(process.wait(), reader.read_remaining());
    Ok(RunResult::new(exit_code_of(status?), output))
}

/// Poll the child, feeding each chunk to `handler`.
///
/// Each chunk is appended to the accumulated output before the handler sees
/// it. When `deadline` passes, the process group is killed and
/// [`RunResult::timed_out`] is returned. When the handler stops the loop, the
/// group is killed and the result carries [`QA_ABANDONED_EXIT_CODE`].
///
/// A handler error kills and reaps the child before it is returned.
pub async fn wait_loop<H: ChunkHandler + ?Sized>(
    process: &mut ProcessHandle,
    reader: &mut OutputReader,
    handler: &mut H,
    config: &LoopConfig,
    deadline: Option<Deadline>,
) -> Result<RunResult> {
    let deadline = deadline.as_ref();
    let mut output = Vec::new();
    let mut state = LoopState::Running;

    nap(config.init_delay, deadline).await;
    let mut exited = process.poll()?.is_some();

    while state == LoopState::Running && !exited {
        let chunk = reader.read_chunk(config.read_size, deadline).await;
        output.extend_from_slice(&chunk);

        match handler.process_output(&chunk, &output) {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Send(answer)) => {
                if let Err(e) = process.send(&answer).await {
                    tracing::warn!(pid = process.pid(), error = %e, "Failed to send answer");
                }
            }
            Ok(LoopAction::Stop) => state = LoopState::Stopping,
            Err(e) => {
                abort(process).await;
                return Err(e);
            }
        }

        if deadline.is_some_and(Deadline::is_expired) {
            return timed_out(process, output.len()).await;
        }

        if state == LoopState::Running {
            if chunk.is_empty() {
                nap(config.main_delay, deadline).await;
            }
            exited = process.poll()?.is_some();
        }
    }

    let forced = state == LoopState::Stopping;
    if forced {
        process.kill_tree();
    }

    // A descendant can keep a blocking pipe open after the shell is gone.
    let rest = reader.drain(FINAL_SETTLE, deadline).await;
    if rest.expired {
        return timed_out(process, output.len() + rest.output.len()).await;
    }
    output.extend_from_slice(&rest.output);
    if let Err(e) = handler.process_output_final(&rest.output, &output) {
        abort(process).await;
        return Err(e);
    }

    let status = process.wait().await?;
    let exit_code = if forced {
        QA_ABANDONED_EXIT_CODE
    } else {
        exit_code_of(status)
    };
    tracing::trace!(pid = process.pid(), exit_code, "Loop finished");
    Ok(RunResult::new(exit_code, output))
}

async fn timed_out(process: &mut ProcessHandle, output_len: usize) -> Result<RunResult> {
    tracing::warn!(
        pid = process.pid(),
        output_len,
        "Run timed out, killing the process group"
    );
    process.terminate().await?;
    Ok(RunResult::timed_out())
}

async fn abort(process: &mut ProcessHandle) {
    if let Err(e) = process.terminate().await {
        tracing::debug!(pid = process.pid(), error = %e, "Failed to reap child after handler error");
    }
}
