// crates/sync-engine/tests/sqlite_session_tests.rs
//! Engine sessions persisted to a SQLite store

use earmark_core::{ItemId, ProgressStore, UserId};
use earmark_database::{open, DatabaseConfig, SqliteProgressStore};
use earmark_sync_engine::{EngineConfig, EngineState, ProgressEngine, SimulatedTransport};
use std::sync::Arc;
use tempfile::TempDir;

async fn sqlite_store(dir: &TempDir) -> Arc<SqliteProgressStore> {
    let path = dir.path().join("progress.db");
    let pool = open(&DatabaseConfig::new(path).creating()).await.unwrap();
    Arc::new(SqliteProgressStore::new(pool))
}

async fn listen(
    store: Arc<SqliteProgressStore>,
    user: UserId,
    item: ItemId,
    seconds: f64,
) -> ProgressEngine<SimulatedTransport> {
    let mut engine = ProgressEngine::new(
        EngineConfig::default(),
        Some(user),
        item,
        "file:///books/moby-dick.mp3",
        store,
        SimulatedTransport::new(3600.0),
    );
    engine.start().await.unwrap();
    let metadata = engine.transport_mut().finish_loading();
    engine.handle_event(metadata).unwrap();
    assert_eq!(engine.state(), EngineState::Ready);

    engine.play().unwrap();
    for event in engine.transport_mut().advance(seconds) {
        engine.handle_event(event).unwrap();
    }
    engine
}

#[tokio::test]
async fn test_sessions_resume_and_accrue_across_restarts() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    let (user, item) = (UserId::new(), ItemId::new());

    let mut first = listen(store.clone(), user, item, 90.0).await;
    first.pause().unwrap();
    first.teardown().await.unwrap();

    let second = listen(store.clone(), user, item, 30.0).await;
    assert_eq!(second.position(), 120.0);
    let status = second.teardown().await.unwrap();
    assert_eq!(status.failed_writes, 0);

    let record = store.read(user, item).await.unwrap().unwrap();
    assert_eq!(record.position_seconds, 120.0);
    assert_eq!(record.total_listen_time_seconds, 120.0);

    let summary = store.summary(user).await.unwrap();
    assert_eq!(summary.started_items(), 1);
    assert_eq!(summary.total_minutes_listened, 2);
}

#[tokio::test]
async fn test_externally_completed_item_stays_completed() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    let (user, item) = (UserId::new(), ItemId::new());

    let first = listen(store.clone(), user, item, 3600.0).await;
    assert_eq!(first.state(), EngineState::Ended);
    first.teardown().await.unwrap();
    store.mark_completed(user, item).await.unwrap();

    let mut second = listen(store.clone(), user, item, 0.0).await;
    assert!(second.is_completed());
    second.seek(0.0).unwrap();
    second.teardown().await.unwrap();

    let record = store.read(user, item).await.unwrap().unwrap();
    assert!(record.is_completed);
    assert_eq!(record.position_seconds, 0.0);
    assert_eq!(record.total_listen_time_seconds, 3600.0);
}
