//! Locating, loading and saving the config file

use crate::{persistence, Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of the environment variables read by [`ConfigManager::load_with_env_overrides`]
pub const ENV_PREFIX: &str = "EARMARK";

const FILE_NAME: &str = "config.toml";

/// Owns the config file location and routes loads and saves through validation
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Uses the platform config directory
    ///
    /// - Linux: `~/.config/earmark/`
    /// - macOS: `~/Library/Application Support/earmark/`
    /// - Windows: `%APPDATA%\earmark\`
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "earmark").ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_directory(dirs.config_dir().to_path_buf()))
    }

    pub fn with_directory(config_dir: PathBuf) -> Self {
        Self {
            path: config_dir.join(FILE_NAME),
        }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the config, or the defaults if the file does not exist
    pub fn load(&self) -> ConfigResult<Config> {
        persistence::read(&self.path)
    }

    /// Loads the config, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            log::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    }

    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        persistence::write(&self.path, config)
    }

    /// Loads, applies `update_fn` and saves
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use earmark_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.player.persist_debounce_ms = 1500;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if none exists
    ///
    /// Returns `Ok(true)` if a new file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.path.exists() {
            log::info!("Config file already exists at {}", self.path.display());
            return Ok(false);
        }

        self.save(&Config::default())?;
        log::info!("Wrote default config to {}", self.path.display());
        Ok(true)
    }

    /// Loads the config and applies `EARMARK_SECTION_FIELD` environment overrides
    ///
    /// Recognized: `EARMARK_APP_DATABASE_PATH`, `EARMARK_APP_LOG_LEVEL`, `EARMARK_APP_USER_ID`,
    /// `EARMARK_PLAYER_DEFAULT_VOLUME`, `EARMARK_PLAYER_DEFAULT_RATE`,
    /// `EARMARK_PLAYER_PERSIST_DEBOUNCE_MS`, `EARMARK_PLAYER_COMMIT_THRESHOLD_MS`.
    /// Unparsable values are logged and ignored.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_overrides(&mut config, |name| std::env::var(name).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config invalid after env overrides: {}",
                crate::error::join(&errors)
            );
        }
        Ok(config)
    }
}

/// Applies every override `lookup` knows about; `lookup` receives the full variable name
fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

    if let Some(db_path) = var("APP_DATABASE_PATH") {
        config.app.database_path = PathBuf::from(db_path);
    }
    if let Some(level) = parsed(&var, "APP_LOG_LEVEL") {
        config.app.log_level = level;
    }
    if let Some(user_id) = var("APP_USER_ID") {
        config.app.user_id = Some(user_id);
    }
    if let Some(volume) = parsed(&var, "PLAYER_DEFAULT_VOLUME") {
        config.player.default_volume = volume;
    }
    if let Some(rate) = parsed(&var, "PLAYER_DEFAULT_RATE") {
        config.player.default_rate = rate;
    }
    if let Some(window) = parsed(&var, "PLAYER_PERSIST_DEBOUNCE_MS") {
        config.player.persist_debounce_ms = window;
    }
    if let Some(threshold) = parsed(&var, "PLAYER_COMMIT_THRESHOLD_MS") {
        config.player.commit_threshold_ms = threshold;
    }
}

fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = var(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}_{}={:?}: cannot parse", ENV_PREFIX, name, raw);
            None
        }
    }
}
