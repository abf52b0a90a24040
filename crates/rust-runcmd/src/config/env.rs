//! Environment-based configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "RUNCMD";

/// Prefixed environment variable reader.
///
/// Values are captured when the reader is built, so later changes to the
/// process environment are not observed.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Captured variables.
    vars: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Capture the current process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Build a reader over an explicit set of variables.
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&self.var_name(name)).map(String::as_str)
    }

    /// Get a parsed value.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.get(name)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(
                    var = %self.var_name(name),
                    value = %raw,
                    "Ignoring unparsable environment override"
                );
                None
            }
        }
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a duration in milliseconds.
    #[must_use]
    pub fn duration_millis(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name).map(Duration::from_millis)
    }
}

/// Recognised variable names (without prefix).
pub mod vars {
    /// Shell used to interpret command lines.
    pub const SHELL: &str = "SHELL";
    /// Initial loop delay in milliseconds.
    pub const LOOP_INIT_MS: &str = "LOOP_INIT_MS";
    /// Idle loop delay in milliseconds.
    pub const LOOP_MAIN_MS: &str = "LOOP_MAIN_MS";
    /// Bounded read size in bytes.
    pub const READ_SIZE: &str = "READ_SIZE";
    /// Q&A stall tolerance.
    pub const MAX_MISS_COUNT: &str = "MAX_MISS_COUNT";
    /// Q&A list answer cycling.
    pub const CYCLE_ANSWERS: &str = "CYCLE_ANSWERS";
    /// Log filter directive.
    pub const LOG: &str = "LOG";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnvConfig {
        EnvConfig::from_vars(
            "RUNCMD",
            [
                ("RUNCMD_READ_SIZE", "2048"),
                ("RUNCMD_CYCLE_ANSWERS", "TRUE"),
                ("RUNCMD_LOOP_MAIN_MS", " 250 "),
                ("SHELL", "/bin/zsh"),
            ],
        )
    }

    #[test]
    fn prefixed_lookup() {
        let env = sample();
        assert_eq!(env.get("read_size"), Some("2048"));
        assert!(env.get("SHELL").is_none());
        assert!(env.get(vars::CYCLE_ANSWERS).is_some());
    }

    #[test]
    fn typed_values() {
        let env = sample();
        assert_eq!(env.parse::<usize>(vars::READ_SIZE), Some(2048));
        assert_eq!(env.bool(vars::CYCLE_ANSWERS), Some(true));
        assert_eq!(
            env.duration_millis(vars::LOOP_MAIN_MS),
            Some(Duration::from_millis(250))
        );
        assert_eq!(env.bool(vars::MAX_MISS_COUNT), None);
    }

    #[test]
    fn no_prefix() {
        let env = EnvConfig::from_vars("", [("SHELL", "/bin/zsh")]);
        assert_eq!(env.get("shell"), Some("/bin/zsh"));
    }
}
