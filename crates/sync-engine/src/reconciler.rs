// crates/sync-engine/src/reconciler.rs
//! Session-start reconciliation with the persisted snapshot

use crate::error::{EngineError, EngineResult};
use earmark_core::{ItemId, ProgressRecord, ProgressStore, ResumePoint, UserId, Validator};
use earmark_resilience::with_timeout;
use std::time::Duration;

/// Resolves the resume point for (user, item)
///
/// `Ok(None)` means nothing was persisted yet and playback starts from 0. A store failure or a
/// fetch slower than `timeout` is a [`EngineError::Reconcile`]; callers treat it like `Ok(None)`.
pub async fn bootstrap(
    store: &dyn ProgressStore,
    user_id: UserId,
    item_id: ItemId,
    timeout: Duration,
) -> EngineResult<Option<ResumePoint>> {
    Ok(fetch_snapshot(store, user_id, item_id, timeout)
        .await?
        .map(|record| record.resume_point()))
}

/// Fetches the persisted record for (user, item) once, bounded by `timeout`
///
/// A record with out-of-range values is rejected rather than resumed from.
pub async fn fetch_snapshot(
    store: &dyn ProgressStore,
    user_id: UserId,
    item_id: ItemId,
    timeout: Duration,
) -> EngineResult<Option<ProgressRecord>> {
    let record = with_timeout(timeout, store.read(user_id, item_id))
        .await
        .map_err(|e| EngineError::Reconcile(e.to_string()))?
        .map_err(|e| EngineError::Reconcile(e.to_string()))?;

    if let Some(Err(errors)) = record.as_ref().map(Validator::validate) {
        return Err(EngineError::Reconcile(format!(
            "Stored progress for {} is invalid: {}",
            item_id,
            errors.join("; ")
        )));
    }

    match &record {
        Some(record) => log::info!(
            "Resume point for {} at {:.0}s (rate {}, volume {})",
            item_id,
            record.position_seconds,
            record.playback_rate.value(),
            record.volume.value()
        ),
        None => log::info!("No saved progress for {}, starting from 0", item_id),
    }

    Ok(record)
}
