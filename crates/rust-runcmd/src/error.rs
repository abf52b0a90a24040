//! Error types for rust-runcmd.
//!
//! Only setup failures are errors. A command that exits non-zero, a Q&A
//! session that gives up, or a run that hits its timeout all produce a
//! [`RunResult`](crate::RunResult) with a sentinel exit code instead.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for rust-runcmd operations.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to spawn the child process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A Q&A question could not be turned into a usable pattern.
    #[error("invalid question {question:?}: {reason}")]
    InvalidQuestion {
        /// The question as given by the caller.
        question: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An output handler failed while processing a chunk.
    #[error("output handler failed: {message}")]
    Handler {
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised while preparing or spawning the child process.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The command line is empty.
    #[error("empty command")]
    EmptyCommand,

    /// Working directory does not exist or is not a directory.
    #[error("invalid working directory {}: {reason}", path.display())]
    InvalidWorkingDir {
        /// The rejected path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The output pipe could not be created.
    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] std::io::Error),

    /// PTY allocation failed.
    #[error("failed to allocate PTY: {0}")]
    PtyAllocation(#[source] std::io::Error),

    /// The redirect file could not be opened.
    #[error("failed to open output file {}: {source}", path.display())]
    OutputFile {
        /// The redirect target.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the initial input to the child failed.
    #[error("failed to write input to child: {0}")]
    Input(#[source] std::io::Error),

    /// General I/O error during spawn.
    #[error("I/O error during spawn: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for rust-runcmd operations.
pub type Result<T> = std::result::Result<T, RunError>;

impl RunError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid question error.
    pub fn invalid_question(question: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuestion {
            question: question.into(),
            reason: reason.into(),
        }
    }

    /// Create a handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this error was raised by configuration validation.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidQuestion { .. } | Self::Regex(_)
        )
    }
}

impl SpawnError {
    /// Create an invalid working directory error.
    pub fn invalid_working_dir(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidWorkingDir {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
