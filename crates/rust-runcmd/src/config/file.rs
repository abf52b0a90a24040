//! File-based configuration loading.

use std::path::Path;

use serde::de::DeserializeOwned;

use super::RunConfig;
use crate::error::{Result, RunError};
use crate::qa::QaSpec;

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Deserialize `text` in this format.
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T> {
        match self {
            Self::Toml => toml::from_str(text).map_err(|e| RunError::config(e.to_string())),
            Self::Json => serde_json::from_str(text).map_err(|e| RunError::config(e.to_string())),
        }
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        RunError::config(format!(
            "unsupported config file extension: {}",
            path.display()
        ))
    })?;
    let text = RunError::with_io_context(
        std::fs::read_to_string(path),
        format!("reading {}", path.display()),
    )?;
    format.parse(&text).map_err(|e| match e {
        RunError::Config { message } => {
            RunError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Load a [`RunConfig`] from a TOML or JSON file.
///
/// Missing keys take their defaults. Environment overrides are not applied;
/// chain [`RunConfig::with_env`] for that.
pub fn load_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let config: RunConfig = load(path.as_ref())?;
    tracing::debug!(path = %path.as_ref().display(), ?config, "Loaded run configuration");
    Ok(config)
}

/// Load a [`QaSpec`] from a TOML or JSON file.
///
/// Answers that are neither a string nor a list of strings are rejected here,
/// before any process is started.
pub fn load_qa_spec(path: impl AsRef<Path>) -> Result<QaSpec> {
    let spec: QaSpec = load(path.as_ref())?;
    spec.validate()?;
    Ok(spec)
}
