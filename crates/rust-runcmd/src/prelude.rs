//! Convenient re-exports for common rust-runcmd usage.
//!
//! ```ignore
//! use rust_runcmd::prelude::*;
//! ```

// Running commands
pub use crate::command::Command;
pub use crate::run::{FailureLog, OutputEcho, RunOptions, Runner, run};
pub use crate::shortcuts::{
    run_async, run_file, run_loop_log, run_nocheck, run_pty, run_qa, run_qa_log, run_qa_stdout,
    run_simple, run_timeout, run_to_stdout,
};

// Results
pub use crate::types::{Outcome, QA_ABANDONED_EXIT_CODE, RunResult, TIMEOUT_EXIT_CODE};

// Error handling
pub use crate::error::{Result, RunError, SpawnError};

// Configuration
pub use crate::config::{LoopConfig, QaConfig, RunConfig};
pub use crate::launch::Backend;
pub use crate::logging::{LogFormat, LoggingConfig};
pub use crate::wait::WaitStrategy;

// Q&A
pub use crate::handler::{ChunkHandler, LoopAction};
pub use crate::qa::{Answer, QaSpec};
