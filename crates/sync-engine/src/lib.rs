// crates/sync-engine/src/lib.rs
//! Playback progress synchronization engine
//!
//! This crate keeps a listening session's playback state in step with durable storage:
//! - Resume point reconciliation at session start, applied exactly once
//! - Trailing-edge debounced writes driven by position ticks
//! - Explicit commits on pause, end of media and teardown
//! - One serialized writer per session, so writes never race each other
//! - Forward-only listen time accrual computed against the stored record
//!
//! # Example
//!
//! ```rust
//! use earmark_core::{ItemId, UserId};
//! use earmark_sync_engine::{
//!     EngineConfig, EngineState, MemoryProgressStore, ProgressEngine, SimulatedTransport,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), earmark_sync_engine::EngineError> {
//! let store = Arc::new(MemoryProgressStore::new());
//! let (user, item) = (UserId::new(), ItemId::new());
//! let mut engine = ProgressEngine::new(
//!     EngineConfig::default(),
//!     Some(user),
//!     item,
//!     "https://cdn.example.com/book.mp3",
//!     store.clone(),
//!     SimulatedTransport::new(600.0),
//! );
//!
//! engine.start().await?;
//! let metadata = engine.transport_mut().finish_loading();
//! engine.handle_event(metadata)?;
//! assert_eq!(engine.state(), EngineState::Ready);
//!
//! engine.play()?;
//! for event in engine.transport_mut().advance(30.0) {
//!     engine.handle_event(event)?;
//! }
//! engine.pause()?;
//!
//! engine.teardown().await;
//! let record = store.get(user, item)?.unwrap();
//! assert_eq!(record.position_seconds, 30.0);
//! assert_eq!(record.total_listen_time_seconds, 30.0);
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
mod memory;
mod reconciler;
mod transport;
mod writer;

pub use config::{
    EngineConfig, DEFAULT_COMMIT_THRESHOLD, DEFAULT_DEBOUNCE_WINDOW, DEFAULT_RECONCILE_TIMEOUT,
};
pub use engine::{progress_percent, EngineState, ProgressCallback, ProgressEngine};
pub use error::{
    Diagnostic, DiagnosticKind, EngineError, EngineResult, TransportError, TransportResult,
};
pub use memory::MemoryProgressStore;
pub use reconciler::{bootstrap, fetch_snapshot};
pub use transport::{MediaTransport, SimulatedTransport, TransportAdapter, TransportEvent};
pub use writer::{persist_progress, PlaybackSnapshot, WriterHandle, WriterStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: EngineConfig = EngineConfig::default();
        let _: MemoryProgressStore = MemoryProgressStore::new();
        let _: SimulatedTransport = SimulatedTransport::new(1.0);
        assert_eq!(DEFAULT_DEBOUNCE_WINDOW.as_millis(), 2000);
    }
}
