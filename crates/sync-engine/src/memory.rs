// crates/sync-engine/src/memory.rs
//! In-memory Progress Store
//!
//! A blind upsert store with no compare-and-swap, like a remote record service. It can be told
//! to fail or to delay calls so tests can reproduce an unreachable store and overlapping writes.

use async_trait::async_trait;
use earmark_core::{
    AppError, ItemId, ProgressPatch, ProgressRecord, ProgressStore, Result, Timestamp, UserId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type Key = (UserId, ItemId);

/// [`ProgressStore`] kept in process memory
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<Key, ProgressRecord>>,
    upsert_delays: Mutex<VecDeque<Duration>>,
    read_delay: Mutex<Option<Duration>>,
    reads: AtomicUsize,
    upserts: AtomicUsize,
    fail_reads: AtomicBool,
    fail_upserts: AtomicBool,
}

impl MemoryProgressStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record as if an earlier session had written it
    pub fn insert(&self, record: ProgressRecord) -> Result<()> {
        self.lock_records()?
            .insert((record.user_id, record.item_id), record);
        Ok(())
    }

    /// Returns the stored record without counting a read
    pub fn get(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ProgressRecord>> {
        Ok(self.lock_records()?.get(&(user_id, item_id)).cloned())
    }

    /// Sets the completion flag once, as the catalog service does
    pub fn mark_completed(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        let mut records = self.lock_records()?;
        let record = records
            .get_mut(&(user_id, item_id))
            .ok_or_else(|| AppError::RecordNotFound {
                entity: "ProgressRecord".to_string(),
                identifier: format!("{}/{}", user_id, item_id),
            })?;
        record.mark_completed(Timestamp::now());
        Ok(())
    }

    /// Number of `read` calls served
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `upsert` calls that reached the store
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Makes every read fail until switched off
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every upsert fail until switched off
    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Delays every read by `delay`
    pub fn set_read_delay(&self, delay: Duration) -> Result<()> {
        *lock(&self.read_delay)? = Some(delay);
        Ok(())
    }

    /// Delays the next upsert calls, one queued delay per call in arrival order
    pub fn push_upsert_delay(&self, delay: Duration) -> Result<()> {
        lock(&self.upsert_delays)?.push_back(delay);
        Ok(())
    }

    fn lock_records(&self) -> Result<MutexGuard<'_, HashMap<Key, ProgressRecord>>> {
        lock(&self.records)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| AppError::InternalError {
        message: "Progress store lock poisoned".to_string(),
    })
}

fn unreachable_store(operation: &str) -> AppError {
    AppError::NetworkError {
        message: format!("Progress store unreachable during {}", operation),
        source: None,
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn read(&self, user_id: UserId, item_id: ItemId) -> Result<Option<ProgressRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.read_delay)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unreachable_store("read"));
        }

        self.get(user_id, item_id)
    }

    async fn upsert(
        &self,
        user_id: UserId,
        item_id: ItemId,
        patch: ProgressPatch,
    ) -> Result<ProgressRecord> {
        let delay = lock(&self.upsert_delays)?.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(unreachable_store("upsert"));
        }

        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut records = self.lock_records()?;
        let record = records
            .entry((user_id, item_id))
            .and_modify(|record| record.apply(&patch))
            .or_insert_with(|| ProgressRecord::create(user_id, item_id, &patch));
        Ok(record.clone())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressRecord>> {
        Ok(self
            .lock_records()?
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }
}
