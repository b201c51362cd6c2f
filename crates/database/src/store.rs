//! SQLite-backed Progress Store

use crate::queries::progress;
use crate::DbPool;
use async_trait::async_trait;
use earmark_core::{
    ItemId, ProgressPatch, ProgressRecord, ProgressStore, ProgressSummary, Result, Timestamp,
    UserId,
};

/// [`ProgressStore`] over an sqlx SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    pool: DbPool,
}

impl SqliteProgressStore {
    /// Wraps a pool whose migrations have already run
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Flags an item as completed for a user
    pub async fn mark_completed(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        progress::mark_completed(&self.pool, user_id, item_id, Timestamp::now()).await
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn read(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ProgressRecord>> {
        progress::get_progress(&self.pool, user_id, item_id).await
    }

    async fn upsert(
        &self,
        user_id: UserId,
        item_id: ItemId,
        patch: ProgressPatch,
    ) -> Result<ProgressRecord> {
        progress::upsert_progress(&self.pool, user_id, item_id, &patch).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressRecord>> {
        progress::list_user_progress(&self.pool, user_id).await
    }

    async fn summary(&self, user_id: UserId) -> Result<ProgressSummary> {
        progress::get_user_summary(&self.pool, user_id).await
    }
}
