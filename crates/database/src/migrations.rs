//! Database migrations

use crate::DbPool;
use earmark_core::AppError;

/// Migration 001: Progress table
const MIGRATION_001: &str = include_str!("../migrations/001_audio_progress.sql");

/// Migration 002: Progress indexes
const MIGRATION_002: &str = include_str!("../migrations/002_progress_indexes.sql");

/// Current database schema version
pub const CURRENT_VERSION: i64 = 2;

/// Returns the current migration version
pub fn current_version() -> i64 {
    CURRENT_VERSION
}

/// Runs all pending migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    // Create migrations table if it doesn't exist
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to create migrations table", e))?;

    // Run each migration
    run_migration(pool, 1, MIGRATION_001).await?;
    run_migration(pool, 2, MIGRATION_002).await?;

    Ok(())
}

/// Runs a single migration if not already applied
///
/// The migration body and its version row are committed together.
async fn run_migration(pool: &DbPool, version: i64, sql: &str) -> Result<(), AppError> {
    // Check if migration already applied
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?")
            .bind(version)
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::database("Failed to check migration status", e))?;

    if applied.is_some() {
        return Ok(());
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::database("Failed to begin migration transaction", e))?;

    sqlx::raw_sql(sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::MigrationFailed {
            version,
            reason: e.to_string(),
        })?;

    sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to record migration", e))?;

    tx.commit()
        .await
        .map_err(|e| AppError::database("Failed to commit migration", e))?;

    log::info!("Applied database migration {}", version);
    Ok(())
}
