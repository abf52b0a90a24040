//! Command representation.

use std::fmt;

/// A command handed to the shell.
///
/// Either a ready-made shell line or a token list. Tokens are joined with
/// single spaces and are *not* quoted: shell metacharacters inside a token
/// are interpreted by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A complete shell command line.
    Line(String),
    /// Tokens joined with single spaces before execution.
    Tokens(Vec<String>),
}

impl Command {
    /// Create a command from a shell line.
    #[must_use]
    pub fn line(line: impl Into<String>) -> Self {
        Self::Line(line.into())
    }

    /// Create a command from tokens.
    #[must_use]
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tokens(tokens.into_iter().map(Into::into).collect())
    }

    /// The line passed to `<shell> -c`.
    #[must_use]
    pub fn shell_line(&self) -> String {
        match self {
            Self::Line(line) => line.clone(),
            Self::Tokens(tokens) => tokens.join(" "),
        }
    }

    /// Whether the command has nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Line(line) => line.trim().is_empty(),
            Self::Tokens(tokens) => tokens.iter().all(|t| t.trim().is_empty()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shell_line())
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Self::Line(s.to_string())
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        Self::Line(s)
    }
}

impl From<Vec<String>> for Command {
    fn from(tokens: Vec<String>) -> Self {
        Self::Tokens(tokens)
    }
}

impl From<&[&str]> for Command {
    fn from(tokens: &[&str]) -> Self {
        Self::tokens(tokens.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Command {
    fn from(tokens: [&str; N]) -> Self {
        Self::tokens(tokens)
    }
}
