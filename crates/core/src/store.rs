//! Contracts for the collaborators the sync engine consumes
//!
//! The Progress Store is a black box with at-least-once semantics: a call may be retried, so
//! `upsert` must be idempotent for identical arguments. The store never computes deltas.

use crate::error::Result;
use crate::types::{ItemId, ProgressPatch, ProgressRecord, ProgressSummary, UserId};
use async_trait::async_trait;

/// Durable keyed storage of one [`ProgressRecord`] per (user, item)
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Reads the record for a (user, item) pair, `None` when nothing was persisted yet
    async fn read(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ProgressRecord>>;

    /// Creates the record on first call and updates it in place afterwards
    ///
    /// Completion fields are never touched by an upsert.
    async fn upsert(
        &self,
        user_id: UserId,
        item_id: ItemId,
        patch: ProgressPatch,
    ) -> Result<ProgressRecord>;

    /// Lists every record belonging to a user
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressRecord>>;

    /// Listening statistics for a user
    async fn summary(&self, user_id: UserId) -> Result<ProgressSummary> {
        Ok(ProgressSummary::from_records(
            self.list_for_user(user_id).await?,
        ))
    }
}

/// Source of the signed-in user
pub trait IdentityService: Send + Sync {
    /// Returns the current user, `None` when nobody is signed in
    fn current_user_id(&self) -> Option<UserId>;
}

/// Identity service with a fixed answer
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    /// A signed-in user
    pub fn signed_in(user_id: UserId) -> Self {
        Self(Some(user_id))
    }

    /// Nobody signed in
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityService for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0
    }
}
