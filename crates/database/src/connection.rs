//! Opening the progress database

use crate::migrations::run_migrations;
use earmark_core::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::time::Duration;

/// Database connection pool
pub type DbPool = Pool<Sqlite>;

/// How long a write waits for another connection's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the progress database lives and how to open it
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// When false, opening a missing file is an error
    pub create_if_missing: bool,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Targets an existing database file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: false,
            max_connections: 4,
        }
    }

    /// Creates the file on first open
    pub fn creating(mut self) -> Self {
        self.create_if_missing = true;
        self
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Opens a WAL-mode pool and applies pending migrations
pub async fn open(config: &DatabaseConfig) -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(config.create_if_missing)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            AppError::database(
                format!("Failed to open progress database {}", config.path.display()),
                e,
            )
        })?;

    run_migrations(&pool).await?;
    log::debug!("Opened progress database at {}", config.path.display());
    Ok(pool)
}

/// Creates an in-memory database for testing
#[cfg(test)]
pub async fn create_test_db() -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .journal_mode(SqliteJournalMode::Memory);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database("Failed to create test database", e))
}
