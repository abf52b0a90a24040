//! Subscriber setup for applications using the engine.
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want to see them call [`init`] or [`try_init`] once at startup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::env::{DEFAULT_PREFIX, vars};
use crate::error::{Result, RunError};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-oriented.
    Pretty,
    /// Single line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUNCMD_LOG` is unset, e.g. `info` or
    /// `rust_runcmd=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Create a logging configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default filter directive.
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Name of the environment variable overriding [`LoggingConfig::level`].
    #[must_use]
    pub fn env_var() -> String {
        format!("{DEFAULT_PREFIX}_{}", vars::LOG)
    }

    fn filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_env(Self::env_var()) {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| {
                RunError::config(format!("invalid log filter {:?}: {e}", self.level))
            }),
        }
    }
}

/// Install a global subscriber.
///
/// Fails if the filter directive is invalid or a global subscriber is
/// already installed.
pub fn try_init(config: &LoggingConfig) -> Result<()> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().finish().try_init(),
        LogFormat::Compact => builder.compact().finish().try_init(),
        LogFormat::Json => builder.json().finish().try_init(),
    };
    installed.map_err(|e| RunError::config(format!("failed to install log subscriber: {e}")))
}

/// Install a global subscriber, ignoring failure.
///
/// Convenient in tests, where several may race to install one.
pub fn init(config: &LoggingConfig) {
    if let Err(e) = try_init(config) {
        tracing::debug!(error = %e, "Log subscriber not installed");
    }
}
