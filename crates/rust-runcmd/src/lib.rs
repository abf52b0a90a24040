//! rust-runcmd: subprocess execution with automated question/answer interaction
//!
//! This crate runs a command through the shell, collects its combined
//! stdout/stderr, and optionally drives an interactive child by answering
//! the prompts it prints.
//!
//! # Features
//!
//! - **Async-first design** with Tokio runtime, plus a blocking [`sync`] facade
//! - **Four I/O backends**: blocking pipe, non-blocking pipe, file redirect, PTY
//! - **Q&A automation** with literal and regex questions, list answers,
//!   `%(name)s` templates and stall detection
//! - **Process-group kills** on timeout or give-up, reaching grandchildren too
//! - **Configuration** from TOML/JSON files and `RUNCMD_*` environment variables
//!
//! # Example
//!
//! ```ignore
//! use rust_runcmd::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let result = run_simple("ls -l /tmp").await?;
//!     println!("{} -> {}", result.exit_code, result.output_str());
//!
//!     let qa = QaSpec::new().question("Overwrite? [y/N]", "y");
//!     let result = run_qa("cp -i a b", qa).await?;
//!     assert_eq!(result.outcome(), Outcome::Success);
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("rust-runcmd supports Unix platforms only");

pub mod command;
pub mod config;
pub mod deadline;
pub mod error;
pub mod handler;
pub mod launch;
pub mod logging;
pub mod prelude;
pub mod pty;
pub mod qa;
pub mod reader;
pub mod run;
pub mod shortcuts;
pub mod sync;
pub mod types;
pub mod wait;

pub use command::Command;
pub use config::{LoopConfig, QaConfig, RunConfig};
pub use error::{Result, RunError, SpawnError};
pub use handler::{ChunkHandler, Collect, LogHandler, LoopAction, TeeHandler};
pub use launch::{Backend, Launcher, ProcessHandle};
pub use logging::{LogFormat, LoggingConfig};
pub use qa::{Answer, InteractionState, QaEngine, QaEntry, QaSpec};
pub use reader::{Drain, OutputReader};
pub use run::{FailureLog, OutputEcho, RunOptions, RunPlan, Runner, run};
pub use shortcuts::{
    run_async, run_file, run_loop_log, run_nocheck, run_pty, run_qa, run_qa_log, run_qa_stdout,
    run_simple, run_timeout, run_to_stdout,
};
pub use types::{
    Outcome, QA_ABANDONED_EXIT_CODE, RunResult, TIMEOUT_EXIT_CODE, TIMEOUT_OUTPUT,
};
pub use wait::{LoopState, WaitStrategy};
