//! The lifecycle driver.
//!
//! [`run`] takes a command and [`RunOptions`] through the same sequence
//! every time: resolve the plan, compile the Q&A specification, validate the
//! working directory, spawn, feed input, wait, clean up, report. Everything
//! that can be rejected statically is rejected before the child exists.

use std::path::PathBuf;
use std::time::Duration;

use crate::command::Command;
use crate::config::RunConfig;
use crate::deadline::Deadline;
use crate::error::{Result, RunError, SpawnError};
use crate::handler::{ChunkHandler, Collect, LogHandler, TeeHandler};
use crate::launch::{Backend, Launcher, ProcessHandle};
use crate::qa::{QaEngine, QaSpec};
use crate::reader::OutputReader;
use crate::types::{DIAGNOSTIC_TAIL_CHARS, RunResult, tail_excerpt};
use crate::wait::{WaitStrategy, wait_loop, wait_simple};

/// Where chunks are echoed while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEcho {
    /// Not echoed.
    #[default]
    None,
    /// Logged through `tracing` at info level.
    Log,
    /// Copied to the caller's stdout.
    Stdout,
}

/// Severity used to report a non-zero exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureLog {
    /// `error` level.
    #[default]
    Error,
    /// `debug` level, for commands whose failure is expected.
    Debug,
}

/// Options for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    backend: Option<Backend>,
    wait: Option<WaitStrategy>,
    working_dir: Option<PathBuf>,
    input: Option<Vec<u8>>,
    qa: Option<QaSpec>,
    timeout: Option<Duration>,
    echo: OutputEcho,
    failure_log: FailureLog,
    config: RunConfig,
}

impl RunOptions {
    /// Options with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with configuration taken from `RUNCMD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new().config(RunConfig::from_env())
    }

    /// Select the I/O backend.
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Select the wait strategy.
    #[must_use]
    pub const fn wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Run the child in `dir`.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Write `input` to the child's stdin, then close it.
    #[must_use]
    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Answer the child's questions.
    #[must_use]
    pub fn qa(mut self, qa: QaSpec) -> Self {
        self.qa = Some(qa);
        self
    }

    /// Kill the child if it runs longer than `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Echo output while the loop runs.
    #[must_use]
    pub const fn echo(mut self, echo: OutputEcho) -> Self {
        self.echo = echo;
        self
    }

    /// Severity for reporting a non-zero exit code.
    #[must_use]
    pub const fn failure_log(mut self, level: FailureLog) -> Self {
        self.failure_log = level;
        self
    }

    /// Report non-zero exit codes at debug level only.
    #[must_use]
    pub const fn no_worries(self) -> Self {
        self.failure_log(FailureLog::Debug)
    }

    /// Replace the engine configuration.
    #[must_use]
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve unset choices and reject incompatible combinations.
    pub fn plan(&self) -> Result<RunPlan> {
        let interactive = self.qa.is_some();
        let timed = self.timeout.is_some();
        let echoing = self.echo != OutputEcho::None;

        if interactive && self.input.is_some() {
            return Err(RunError::config(
                "literal input and Q&A answers cannot be combined",
            ));
        }

        let backend = self.backend.clone().unwrap_or(if interactive || timed {
            Backend::AsyncPipe
        } else {
            Backend::Pipe
        });

        let mut wait = self.wait.unwrap_or(if interactive || timed || echoing {
            WaitStrategy::Loop
        } else {
            WaitStrategy::Simple
        });

        if wait == WaitStrategy::Simple {
            if interactive {
                return Err(RunError::config("Q&A requires the loop wait strategy"));
            }
            if echoing {
                return Err(RunError::config("output echo requires the loop wait strategy"));
            }
            if timed {
                wait = WaitStrategy::Loop;
            }
        }

        if echoing && !backend.captures_output() {
            return Err(RunError::config(format!(
                "output echo requires a pipe backend, not {}",
                backend.name()
            )));
        }

        // Blocking reads would sit on a prompt waiting for a full chunk.
        if interactive && backend != Backend::AsyncPipe {
            return Err(RunError::config(format!(
                "Q&A requires the async-pipe backend, not {}",
                backend.name()
            )));
        }

        Ok(RunPlan {
            backend,
            wait,
            keep_input_open: interactive,
        })
    }
}

/// Resolved choices for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// I/O backend.
    pub backend: Backend,
    /// Wait strategy.
    pub wait: WaitStrategy,
    /// Leave stdin open for answers.
    pub keep_input_open: bool,
}

/// Runs commands with a fixed set of options.
///
/// Each [`Runner::run`] is an independent session.
#[derive(Debug, Clone)]
pub struct Runner {
    options: RunOptions,
    plan: RunPlan,
}

impl Runner {
    /// Validate `options` and resolve the plan.
    pub fn new(options: RunOptions) -> Result<Self> {
        let plan = options.plan()?;
        if let Some(qa) = &options.qa {
            qa.validate()?;
        }
        Ok(Self { options, plan })
    }

    /// The resolved plan.
    #[must_use]
    pub const fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Run `command` once.
    pub async fn run(&self, command: &Command) -> Result<RunResult> {
        let mut handler = self.handler(command)?;

        let mut launcher = Launcher::new(&self.options.config.shell, self.plan.backend.clone());
        if let Some(dir) = &self.options.working_dir {
            launcher = launcher.working_dir(dir);
        }
        let (mut process, mut reader) = launcher.spawn(command)?;

        tracing::debug!(
            pid = process.pid(),
            command = %command,
            backend = self.plan.backend.name(),
            wait = %self.plan.wait,
            "Running command"
        );

        let result = self.drive(&mut process, &mut reader, handler.as_mut()).await;
        reader.close();
        // An unreaped child is killed when `process` drops.
        drop(process);

        let result = result?;
        self.report(command, &result);
        Ok(result)
    }

    fn handler(&self, command: &Command) -> Result<Box<dyn ChunkHandler>> {
        let echo: Option<Box<dyn ChunkHandler>> = match self.options.echo {
            OutputEcho::None => None,
            OutputEcho::Log => Some(Box::new(LogHandler::labelled(command.to_string()))),
            OutputEcho::Stdout => Some(Box::new(TeeHandler::stdout())),
        };
        match &self.options.qa {
            Some(spec) => {
                let mut engine = QaEngine::new(spec, &self.options.config.qa)?;
                if let Some(echo) = echo {
                    engine = engine.with_echo(echo);
                }
                Ok(Box::new(engine))
            }
            None => Ok(echo.unwrap_or_else(|| Box::new(Collect))),
        }
    }

    async fn drive(
        &self,
        process: &mut ProcessHandle,
        reader: &mut OutputReader,
        handler: &mut dyn ChunkHandler,
    ) -> Result<RunResult> {
        self.feed_input(process).await?;
        match self.plan.wait {
            WaitStrategy::Simple => wait_simple(process, reader).await,
            WaitStrategy::Loop => {
                let deadline = self.options.timeout.map(Deadline::from_now);
                wait_loop(process, reader, handler, &self.options.config.poll, deadline).await
            }
        }
    }

    async fn feed_input(&self, process: &mut ProcessHandle) -> Result<()> {
        if self.plan.keep_input_open {
            return Ok(());
        }
        if let Some(input) = &self.options.input {
            match process.send(input).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::warn!(pid = process.pid(), "Child closed stdin before reading input");
                }
                Err(e) => return Err(SpawnError::Input(e).into()),
            }
        }
        process.close_input().await;
        Ok(())
    }

    fn report(&self, command: &Command, result: &RunResult) {
        if result.success() {
            tracing::debug!(command = %command, "Command succeeded");
            return;
        }
        let outcome = result.outcome();
        let tail = tail_excerpt(&result.output, DIAGNOSTIC_TAIL_CHARS);
        match self.options.failure_log {
            FailureLog::Error => tracing::error!(
                command = %command,
                exit_code = result.exit_code,
                %outcome,
                output = %tail,
                "Command failed"
            ),
            FailureLog::Debug => tracing::debug!(
                command = %command,
                exit_code = result.exit_code,
                %outcome,
                output = %tail,
                "Command failed"
            ),
        }
    }
}

/// Run `command` with `options`.
///
/// Setup problems (bad options, an invalid Q&A specification, a missing
/// working directory, spawn failures) are errors. A command that fails, times
/// out or is abandoned is not: inspect [`RunResult::exit_code`].
pub async fn run(command: impl Into<Command>, options: RunOptions) -> Result<RunResult> {
    Runner::new(options)?.run(&command.into()).await
}
