//! Configuration types for rust-runcmd.
//!
//! [`RunConfig`] holds the engine tunables: the shell used to run commands,
//! the poll cadence of the loop strategy and the Q&A give-up policy. It can
//! be built in code, loaded from a TOML or JSON file ([`file`]) and
//! overridden from `RUNCMD_*` environment variables ([`env`]).

pub mod env;
pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use env::EnvConfig;
pub use file::{ConfigFormat, load_config, load_qa_spec};

/// Default shell used to interpret command lines.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Delay before the first liveness poll of a loop run (100 ms).
pub const DEFAULT_LOOP_INIT_DELAY: Duration = Duration::from_millis(100);

/// Delay between loop iterations that produced no output (1 second).
pub const DEFAULT_LOOP_MAIN_DELAY: Duration = Duration::from_secs(1);

/// Maximum bytes taken by one bounded read.
pub const DEFAULT_READ_SIZE: usize = 1024;

/// Stalled iterations tolerated before a Q&A run is abandoned.
pub const DEFAULT_MAX_MISS_COUNT: u32 = 20;

/// Whether list answers restart from the first element once exhausted.
pub const DEFAULT_CYCLE_ANSWERS: bool = true;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Interpreter that receives `-c <command line>`.
    pub shell: PathBuf,

    /// Loop strategy cadence.
    pub poll: LoopConfig,

    /// Q&A give-up policy defaults.
    pub qa: QaConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            poll: LoopConfig::default(),
            qa: QaConfig::default(),
        }
    }
}

impl RunConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with `RUNCMD_*` environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(&EnvConfig::default())
    }

    /// Apply overrides found in `overrides` on top of this configuration.
    #[must_use]
    pub fn with_env(mut self, overrides: &EnvConfig) -> Self {
        if let Some(shell) = overrides.get(env::vars::SHELL) {
            self.shell = PathBuf::from(shell);
        }
        if let Some(delay) = overrides.duration_millis(env::vars::LOOP_INIT_MS) {
            self.poll.init_delay = delay;
        }
        if let Some(delay) = overrides.duration_millis(env::vars::LOOP_MAIN_MS) {
            self.poll.main_delay = delay;
        }
        if let Some(size) = overrides.parse::<usize>(env::vars::READ_SIZE) {
            self.poll.read_size = size;
        }
        if let Some(max) = overrides.parse::<u32>(env::vars::MAX_MISS_COUNT) {
            self.qa.max_miss_count = max;
        }
        if let Some(cycle) = overrides.bool(env::vars::CYCLE_ANSWERS) {
            self.qa.cycle_answers = cycle;
        }
        self
    }

    /// Set the shell.
    #[must_use]
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set the loop cadence.
    #[must_use]
    pub const fn poll(mut self, poll: LoopConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the Q&A defaults.
    #[must_use]
    pub const fn qa(mut self, qa: QaConfig) -> Self {
        self.qa = qa;
        self
    }
}

/// Cadence of the loop wait strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Sleep before the first poll, giving the child time to start writing.
    #[serde(rename = "init_delay_ms", with = "duration_ms")]
    pub init_delay: Duration,

    /// Sleep after an iteration whose read returned nothing.
    #[serde(rename = "main_delay_ms", with = "duration_ms")]
    pub main_delay: Duration,

    /// Upper bound of a single bounded read.
    pub read_size: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            init_delay: DEFAULT_LOOP_INIT_DELAY,
            main_delay: DEFAULT_LOOP_MAIN_DELAY,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

impl LoopConfig {
    /// Set the initial delay.
    #[must_use]
    pub const fn init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    /// Set the idle delay between iterations.
    #[must_use]
    pub const fn main_delay(mut self, delay: Duration) -> Self {
        self.main_delay = delay;
        self
    }

    /// Set the bounded read size.
    #[must_use]
    pub const fn read_size(mut self, size: usize) -> Self {
        self.read_size = size;
        self
    }
}

/// Q&A policy defaults, used when a [`QaSpec`](crate::QaSpec) leaves them unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Stalled iterations tolerated before the child is killed.
    pub max_miss_count: u32,

    /// Restart list answers from the start (true) or repeat the last one.
    pub cycle_answers: bool,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            max_miss_count: DEFAULT_MAX_MISS_COUNT,
            cycle_answers: DEFAULT_CYCLE_ANSWERS,
        }
    }
}

/// Serde helper storing a [`Duration`] as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunConfig::default();
        assert_eq!(config.shell, PathBuf::from("/bin/bash"));
        assert_eq!(config.poll.init_delay, Duration::from_millis(100));
        assert_eq!(config.poll.main_delay, Duration::from_secs(1));
        assert_eq!(config.poll.read_size, 1024);
        assert_eq!(config.qa.max_miss_count, 20);
        assert!(config.qa.cycle_answers);
    }

    #[test]
    fn env_overrides() {
        let env = EnvConfig::from_vars(
            "RUNCMD",
            [
                ("RUNCMD_SHELL", "/bin/sh"),
                ("RUNCMD_LOOP_MAIN_MS", "25"),
                ("RUNCMD_MAX_MISS_COUNT", "3"),
                ("RUNCMD_CYCLE_ANSWERS", "no"),
            ],
        );
        let config = RunConfig::default().with_env(&env);
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.poll.main_delay, Duration::from_millis(25));
        assert_eq!(config.poll.init_delay, DEFAULT_LOOP_INIT_DELAY);
        assert_eq!(config.qa.max_miss_count, 3);
        assert!(!config.qa.cycle_answers);
    }

    #[test]
    fn unparsable_env_values_are_ignored() {
        let env = EnvConfig::from_vars("RUNCMD", [("RUNCMD_READ_SIZE", "lots")]);
        let config = RunConfig::default().with_env(&env);
        assert_eq!(config.poll.read_size, DEFAULT_READ_SIZE);
    }

    #[test]
    fn builder_chain() {
        let config = RunConfig::new().shell("/usr/bin/bash").poll(
            LoopConfig::default()
                .init_delay(Duration::from_millis(5))
                .main_delay(Duration::from_millis(10))
                .read_size(64),
        );
        assert_eq!(config.poll.read_size, 64);
        assert_eq!(config.poll.main_delay, Duration::from_millis(10));
    }
}
