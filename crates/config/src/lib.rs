//! Earmark configuration
//!
//! TOML configuration for the earmark tools. Each section implements [`ConfigSection`] so it can
//! check its own values; `EARMARK_*` environment variables override the file.
//!
//! - Invalid values found on load are logged as warnings; saving refuses them
//! - Writes go through a temporary file and an atomic rename
//! - All failures are reported through [`ConfigError`]
//!
//! # Example
//!
//! ```rust
//! use earmark_config::{Config, ConfigManager};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let manager = ConfigManager::with_directory(dir.path().to_path_buf());
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Debounce window: {}ms", config.player.persist_debounce_ms);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod app_config;
mod player_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, Issues, MAX_RATE};

pub use app_config::{AppConfig, LogLevel};
pub use player_config::PlayerConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Playback and progress persistence settings
    pub player: PlayerConfig,
}

impl Config {
    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut issues = Issues::default();
        self.app.check(&mut issues);
        self.player.check(&mut issues);
        issues.into_result()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}
