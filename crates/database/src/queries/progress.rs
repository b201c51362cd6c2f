//! Listening progress database operations

use crate::DbPool;
use earmark_core::{
    AppError, ItemId, PlaybackRate, ProgressPatch, ProgressRecord, ProgressSummary, Timestamp,
    UserId, Volume,
};

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, item_id, position_seconds, playback_rate, volume, last_played_at,
           total_listen_time_seconds, is_completed, completed_at
    FROM audio_progress
"#;

/// Gets the progress record for a (user, item) pair
pub async fn get_progress(
    pool: &DbPool,
    user_id: UserId,
    item_id: ItemId,
) -> Result<Option<ProgressRecord>, AppError> {
    let row = sqlx::query(&format!(
        "{} WHERE user_id = ? AND item_id = ?",
        SELECT_COLUMNS
    ))
    .bind(user_id.as_string())
    .bind(item_id.as_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch progress", e))?;

    row.map(row_to_progress).transpose()
}

/// Inserts or updates progress for a (user, item) pair and returns the stored record
///
/// The patch values are written as given. Completion columns are left untouched.
pub async fn upsert_progress(
    pool: &DbPool,
    user_id: UserId,
    item_id: ItemId,
    patch: &ProgressPatch,
) -> Result<ProgressRecord, AppError> {
    sqlx::query(
        r#"
        INSERT INTO audio_progress (
            user_id, item_id, position_seconds, playback_rate, volume,
            last_played_at, total_listen_time_seconds
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, item_id) DO UPDATE SET
            position_seconds = excluded.position_seconds,
            playback_rate = excluded.playback_rate,
            volume = excluded.volume,
            last_played_at = excluded.last_played_at,
            total_listen_time_seconds = excluded.total_listen_time_seconds
        "#,
    )
    .bind(user_id.as_string())
    .bind(item_id.as_string())
    .bind(patch.position_seconds)
    .bind(patch.playback_rate.value())
    .bind(patch.volume.value())
    .bind(patch.last_played_at.as_millis())
    .bind(patch.total_listen_time_seconds)
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to save progress", e))?;

    get_progress(pool, user_id, item_id)
        .await?
        .ok_or_else(|| AppError::RecordNotFound {
            entity: "ProgressRecord".to_string(),
            identifier: format!("{}/{}", user_id, item_id),
        })
}

/// Lists a user's progress records, most recently played first
pub async fn list_user_progress(
    pool: &DbPool,
    user_id: UserId,
) -> Result<Vec<ProgressRecord>, AppError> {
    let rows = sqlx::query(&format!(
        "{} WHERE user_id = ? ORDER BY last_played_at DESC",
        SELECT_COLUMNS
    ))
    .bind(user_id.as_string())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to list progress", e))?;

    rows.into_iter().map(row_to_progress).collect()
}

/// Computes listening statistics for a user
pub async fn get_user_summary(pool: &DbPool, user_id: UserId) -> Result<ProgressSummary, AppError> {
    Ok(ProgressSummary::from_records(
        list_user_progress(pool, user_id).await?,
    ))
}

/// Flags an item as completed
///
/// One-way: an already completed record keeps its original completion time.
pub async fn mark_completed(
    pool: &DbPool,
    user_id: UserId,
    item_id: ItemId,
    at: Timestamp,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE audio_progress
        SET is_completed = 1, completed_at = COALESCE(completed_at, ?)
        WHERE user_id = ? AND item_id = ?
        "#,
    )
    .bind(at.as_millis())
    .bind(user_id.as_string())
    .bind(item_id.as_string())
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to mark progress completed", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::RecordNotFound {
            entity: "ProgressRecord".to_string(),
            identifier: format!("{}/{}", user_id, item_id),
        });
    }

    Ok(())
}

fn row_to_progress(row: sqlx::sqlite::SqliteRow) -> Result<ProgressRecord, AppError> {
    use sqlx::Row;

    let user_id_str: String = row
        .try_get("user_id")
        .map_err(|e| AppError::database("Missing user ID", e))?;
    let user_id = UserId::from_string(&user_id_str)
        .map_err(|e| AppError::database("Invalid user ID", e))?;

    let item_id_str: String = row
        .try_get("item_id")
        .map_err(|e| AppError::database("Missing item ID", e))?;
    let item_id = ItemId::from_string(&item_id_str)
        .map_err(|e| AppError::database("Invalid item ID", e))?;

    let position_seconds: f64 = row
        .try_get("position_seconds")
        .map_err(|e| AppError::database("Missing position", e))?;
    let playback_rate: f64 = row
        .try_get("playback_rate")
        .map_err(|e| AppError::database("Missing playback rate", e))?;
    let volume: f64 = row
        .try_get("volume")
        .map_err(|e| AppError::database("Missing volume", e))?;
    let last_played_at: i64 = row
        .try_get("last_played_at")
        .map_err(|e| AppError::database("Missing last_played_at", e))?;
    let total_listen_time_seconds: f64 = row
        .try_get("total_listen_time_seconds")
        .map_err(|e| AppError::database("Missing total listen time", e))?;
    let is_completed: i64 = row
        .try_get("is_completed")
        .map_err(|e| AppError::database("Missing is_completed", e))?;
    let completed_at: Option<i64> = row
        .try_get("completed_at")
        .map_err(|e| AppError::database("Missing completed_at", e))?;

    Ok(ProgressRecord {
        user_id,
        item_id,
        position_seconds,
        playback_rate: PlaybackRate::new_unchecked(playback_rate),
        volume: Volume::new_unchecked(volume),
        last_played_at: Timestamp::from_millis(last_played_at),
        total_listen_time_seconds,
        is_completed: is_completed != 0,
        completed_at: completed_at.map(Timestamp::from_millis),
    })
}
