//! Config file I/O
//!
//! A save writes a temporary file next to the config and renames it into place, so a crash
//! mid-save leaves the old file intact.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads `path`, or the defaults when the file does not exist
///
/// Values that fail validation are kept and logged so they can be fixed in place.
pub fn read(path: &Path) -> ConfigResult<Config> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(ConfigError::io(path, e)),
    };

    let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if config.version != CONFIG_VERSION {
        log::warn!(
            "{} declares config version {}, reading it as version {}",
            path.display(),
            config.version,
            CONFIG_VERSION
        );
        config.version = CONFIG_VERSION;
    }

    if let Err(errors) = config.validate() {
        log::warn!("{}: {}", path.display(), crate::error::join(&errors));
    }

    Ok(config)
}

/// Validates `config` and atomically replaces `path` with it
pub fn write(path: &Path, config: &Config) -> ConfigResult<()> {
    config.validate().map_err(ConfigError::Invalid)?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;

    let contents = toml::to_string_pretty(config)?;
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
    temp.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::io(dir, e))?;
    temp.persist(path).map_err(|e| ConfigError::io(path, e.error))?;

    log::debug!("Saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_path() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        (dir, path)
    }

    #[test]
    fn test_missing_file_reads_as_defaults() {
        let (_dir, path) = config_path();
        assert_eq!(read(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, path) = config_path();
        let mut config = Config::default();
        config.player.persist_debounce_ms = 500;
        config.player.rate_options = vec![1.0, 1.5];

        write(&path, &config).unwrap();
        assert_eq!(read(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let (_dir, path) = config_path();
        fs::write(&path, "[player]\nskip_seconds = 30\n").unwrap();

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.player.skip_seconds, 30);
        assert_eq!(loaded.player.persist_debounce_ms, 2000);
        assert_eq!(loaded.app, Config::default().app);
    }

    #[test]
    fn test_future_version_is_read_as_current() {
        let (_dir, path) = config_path();
        fs::write(&path, "version = 7\n").unwrap();
        assert_eq!(read(&path).unwrap().version, CONFIG_VERSION);
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write(&path, &Config::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        let (_dir, path) = config_path();
        fs::write(&path, "this is not valid TOML {{{").unwrap();
        assert!(matches!(read(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_invalid_values_load_but_never_save() {
        let (_dir, path) = config_path();
        fs::write(&path, "[player]\ndefault_volume = 3.0\n").unwrap();

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.player.default_volume, 3.0);

        let result = write(&path, &loaded);
        assert!(matches!(result, Err(ConfigError::Invalid(errors)) if errors.len() == 1));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[player]\ndefault_volume = 3.0\n"
        );
    }
}
