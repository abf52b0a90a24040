//! Result types and reserved exit codes.

use std::borrow::Cow;
use std::fmt;
use std::process::ExitStatus;

/// Exit code reported when a run exceeded its wall-clock timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 123;

/// Output reported when a run exceeded its wall-clock timeout.
pub const TIMEOUT_OUTPUT: &str = "";

/// Exit code reported when a Q&A run gave up on a stalled child.
pub const QA_ABANDONED_EXIT_CODE: i32 = 124;

/// Number of trailing characters logged for diagnosis when a run is abandoned.
pub const DIAGNOSTIC_TAIL_CHARS: usize = 500;

/// The outcome of one run: exit code and everything the child wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Exit code of the child, `-signal` if it was killed by a signal, or one
    /// of the sentinels [`TIMEOUT_EXIT_CODE`] / [`QA_ABANDONED_EXIT_CODE`].
    pub exit_code: i32,
    /// Combined stdout and stderr, in the order it was written.
    pub output: Vec<u8>,
}

impl RunResult {
    /// Create a result.
    #[must_use]
    pub const fn new(exit_code: i32, output: Vec<u8>) -> Self {
        Self { exit_code, output }
    }

    /// The result reported for a run that hit its timeout.
    #[must_use]
    pub fn timed_out() -> Self {
        Self::new(TIMEOUT_EXIT_CODE, TIMEOUT_OUTPUT.as_bytes().to_vec())
    }

    /// Whether the child exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn output_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }

    /// Classify the exit code.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self.exit_code {
            0 => Outcome::Success,
            TIMEOUT_EXIT_CODE => Outcome::TimedOut,
            QA_ABANDONED_EXIT_CODE => Outcome::QaAbandoned,
            code => Outcome::Failed(code),
        }
    }
}

/// How a run ended, derived from its exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit code 0.
    Success,
    /// Any other exit code that is not a sentinel.
    Failed(i32),
    /// The Q&A engine gave up and killed the process group.
    QaAbandoned,
    /// The wall-clock timeout expired and the process group was killed.
    TimedOut,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed(code) => write!(f, "failed (exit code {code})"),
            Self::QaAbandoned => write!(f, "abandoned (no answerable question)"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Convert an OS exit status to an integer exit code.
///
/// Signal deaths are reported as the negated signal number.
#[must_use]
pub fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        code
    } else if let Some(signal) = status.signal() {
        -signal
    } else {
        -1
    }
}

/// The last `max_chars` characters of `output`, lossily decoded.
#[must_use]
pub fn tail_excerpt(output: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(output);
    let count = text.chars().count();
    if count <= max_chars {
        return text.into_owned();
    }
    text.chars().skip(count - max_chars).collect()
}
