//! Config errors

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading, writing or creating the config location failed
    #[error("Config I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Refused to save values that do not validate
    #[error("Invalid config: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    #[error("No config directory is known for this platform")]
    NoConfigDir,
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One setting that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted setting name, e.g. `player.persist_debounce_ms`
    pub field: String,
    pub message: String,
    /// The rejected value as written
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::new(field, message)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} (got {})", self.field, self.message, value),
            None => write!(f, "{} {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
