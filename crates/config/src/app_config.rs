//! Application-level configuration section

use crate::error::ValidationError;
use crate::validation::{ConfigSection, Issues};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ValidationError::with_value(
                "app.log_level",
                "must be one of: error, warn, info, debug, trace",
                s,
            )),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Progress database file path
    pub database_path: PathBuf,

    /// Log level used when `RUST_LOG` is unset
    pub log_level: LogLevel,

    /// Signed-in user; commands fall back to this when no `--user` is given
    pub user_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("earmark.db"),
            log_level: LogLevel::Info,
            user_id: None,
        }
    }
}

impl ConfigSection for AppConfig {
    fn section_name(&self) -> &'static str {
        "app"
    }

    fn check(&self, issues: &mut Issues) {
        issues.not_empty("app.database_path", &self.database_path.to_string_lossy());

        if let Some(user_id) = &self.user_id {
            if uuid::Uuid::parse_str(user_id).is_err() {
                issues.push(ValidationError::with_value(
                    "app.user_id",
                    "must be a UUID",
                    user_id,
                ));
            }
        }
    }
}
