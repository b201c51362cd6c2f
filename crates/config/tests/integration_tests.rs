//! Integration tests for the configuration system

use earmark_config::{
    AppConfig, Config, ConfigError, ConfigManager, ConfigSection, LogLevel, PlayerConfig, CONFIG_VERSION,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf());
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let created = manager.initialize()?;
    assert!(created);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.player.persist_debounce_ms = 3000;
    modified.app.user_id = Some("67e55044-10b1-426f-9247-bb680e5fe0c8".to_string());
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded, modified);

    assert!(!manager.initialize()?);
    assert_eq!(manager.load()?, modified);

    Ok(())
}

#[test]
fn test_invalid_config_is_never_written() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.save(&Config::default())?;

    let mut invalid = Config::default();
    invalid.player.reconcile_timeout_ms = 0;
    match manager.save(&invalid) {
        Err(ConfigError::Invalid(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "player.reconcile_timeout_ms");
        }
        other => panic!("expected Invalid, got {:?}", other),
    }

    assert_eq!(manager.load()?, Config::default());
    Ok(())
}

#[test]
fn test_hand_written_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(
        manager.config_path(),
        r#"
version = 1

[app]
database_path = "/var/lib/earmark/progress.db"
log_level = "debug"

[player]
default_rate = 1.25
rate_options = [1.0, 1.25, 1.5]
commit_threshold_ms = 0
"#,
    )?;

    let config = manager.load()?;
    assert_eq!(
        config.app.database_path,
        PathBuf::from("/var/lib/earmark/progress.db")
    );
    assert_eq!(config.app.log_level, LogLevel::Debug);
    assert_eq!(config.app.user_id, None);
    assert_eq!(config.player.default_rate, 1.25);
    assert_eq!(config.player.rate_options, vec![1.0, 1.25, 1.5]);
    assert_eq!(config.player.commit_threshold_ms, 0);
    assert_eq!(config.player.persist_debounce_ms, 2000);
    assert!(config.validate().is_ok());

    Ok(())
}

#[test]
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "[player\nskip_seconds = ")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_unknown_log_level_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "[app]\nlog_level = \"loud\"\n")?;

    assert!(manager.load().is_err());
    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path);

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());
    Ok(())
}

#[test]
fn test_all_sections_default_are_valid() {
    assert!(AppConfig::default().validate().is_ok());
    assert!(PlayerConfig::default().validate().is_ok());
    assert!(Config::default().validate().is_ok());
    assert_eq!(AppConfig::default().section_name(), "app");
    assert_eq!(PlayerConfig::default().section_name(), "player");
}

#[test]
fn test_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let mut original = Config::default();
    original.app.user_id = Some("67e55044-10b1-426f-9247-bb680e5fe0c8".to_string());
    let toml_string = toml::to_string(&original)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(original, deserialized);
    Ok(())
}
