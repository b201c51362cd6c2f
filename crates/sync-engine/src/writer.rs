// crates/sync-engine/src/writer.rs
//! Serialized progress writer
//!
//! Every durable write for one (user, item) goes through a single task, so at most one write is
//! in flight. Tick-driven notifications are coalesced by a trailing-edge [`Debouncer`] whose max
//! wait equals the window, so continuous playback still saves once per window; explicit commits
//! bypass the window. Requests that arrive while a write is in flight wait for it to
//! settle and are then folded into one write carrying the latest state.
//!
//! Each write reads the stored record first and computes the listen-time delta against it, so a
//! skipped or failed write never compounds into drift. Failed writes are logged and counted but
//! not retried: the next notification naturally carries fresher state.

use crate::error::{Diagnostic, DiagnosticKind, EngineError, EngineResult};
use earmark_core::{
    AppError, ItemId, PlaybackRate, ProgressPatch, ProgressRecord, ProgressStore, Timestamp,
    UserId, Volume,
};
use earmark_resilience::Debouncer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Playback state captured at the moment a write was requested
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub position: f64,
    pub rate: PlaybackRate,
    pub volume: Volume,
}

impl PlaybackSnapshot {
    pub fn new(position: f64, rate: PlaybackRate, volume: Volume) -> Self {
        Self {
            position,
            rate,
            volume,
        }
    }
}

/// What the writer has achieved so far
#[derive(Debug, Clone, Default)]
pub struct WriterStatus {
    /// Record returned by the last successful write
    pub record: Option<ProgressRecord>,
    /// When the last successful write completed
    pub last_write_at: Option<Instant>,
    pub writes: u64,
    pub failed_writes: u64,
    /// Most recent failure, if any
    pub last_failure: Option<Diagnostic>,
}

/// Reads the stored record, computes the patch against it and upserts it
///
/// Returns the stored record and the listen time this write added. This is one unserialized
/// write; two calls racing on the same key can lose an update.
pub async fn persist_progress(
    store: &dyn ProgressStore,
    user_id: UserId,
    item_id: ItemId,
    snapshot: PlaybackSnapshot,
) -> Result<(ProgressRecord, f64), AppError> {
    let previous = store.read(user_id, item_id).await?;
    let patch = ProgressPatch::compute(
        previous.as_ref(),
        snapshot.position,
        snapshot.rate,
        snapshot.volume,
        Timestamp::now(),
    );
    let delta = patch.delta_from(previous.as_ref());
    let record = store.upsert(user_id, item_id, patch).await?;
    Ok((record, delta))
}

#[derive(Debug)]
enum WriterCommand {
    Notify(PlaybackSnapshot),
    Commit(PlaybackSnapshot),
    Settle(oneshot::Sender<WriterStatus>),
    Shutdown(Option<PlaybackSnapshot>),
}

/// Commands folded together while the writer was busy
#[derive(Debug, Default)]
struct Batch {
    latest: Option<PlaybackSnapshot>,
    write_now: bool,
    shutdown: bool,
    settle: Vec<oneshot::Sender<WriterStatus>>,
}

impl Batch {
    fn absorb(&mut self, command: WriterCommand) {
        match command {
            WriterCommand::Notify(snapshot) => self.latest = Some(snapshot),
            WriterCommand::Commit(snapshot) => {
                self.latest = Some(snapshot);
                self.write_now = true;
            }
            WriterCommand::Settle(reply) => self.settle.push(reply),
            WriterCommand::Shutdown(final_snapshot) => {
                if let Some(snapshot) = final_snapshot {
                    self.latest = Some(snapshot);
                    self.write_now = true;
                }
                self.shutdown = true;
            }
        }
    }

    fn fired(&mut self, snapshot: PlaybackSnapshot) {
        self.latest = Some(snapshot);
        self.write_now = true;
    }
}

struct ProgressWriter {
    store: Arc<dyn ProgressStore>,
    user_id: UserId,
    item_id: ItemId,
    debouncer: Debouncer<PlaybackSnapshot>,
    commands: mpsc::UnboundedReceiver<WriterCommand>,
    status: watch::Sender<WriterStatus>,
}

impl ProgressWriter {
    async fn run(mut self) {
        log::debug!("Progress writer started for {}/{}", self.user_id, self.item_id);

        loop {
            let mut batch = Batch::default();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => batch.absorb(command),
                    None => break,
                },
                snapshot = self.debouncer.fired() => batch.fired(snapshot),
            }

            while let Ok(command) = self.commands.try_recv() {
                batch.absorb(command);
            }

            if self.process(batch).await {
                break;
            }
        }

        self.debouncer.cancel();
        log::debug!("Progress writer stopped for {}/{}", self.user_id, self.item_id);
    }

    /// Handles one batch, returning true when the writer should stop
    async fn process(&mut self, batch: Batch) -> bool {
        if batch.write_now || batch.shutdown {
            self.debouncer.cancel();
        }

        match batch.latest {
            Some(snapshot) if batch.write_now => self.write(snapshot).await,
            Some(snapshot) if !batch.shutdown => {
                self.debouncer.schedule(snapshot);
            }
            _ => {}
        }

        let status = self.status.borrow().clone();
        for reply in batch.settle {
            let _ = reply.send(status.clone());
        }

        batch.shutdown
    }

    async fn write(&mut self, snapshot: PlaybackSnapshot) {
        match persist_progress(self.store.as_ref(), self.user_id, self.item_id, snapshot).await {
            Ok((record, delta)) => {
                log::debug!(
                    "Saved progress for {}/{}: position {:.0}s, +{:.0}s, total {:.0}s",
                    self.user_id,
                    self.item_id,
                    record.position_seconds,
                    delta,
                    record.total_listen_time_seconds
                );
                self.status.send_modify(|status| {
                    status.record = Some(record);
                    status.last_write_at = Some(Instant::now());
                    status.writes += 1;
                });
            }
            Err(e) => {
                log::warn!(
                    "Failed to save progress for {}/{} ({}, {}): {}",
                    self.user_id,
                    self.item_id,
                    e.severity(),
                    e.recovery_action(),
                    e
                );
                let diagnostic = Diagnostic::new(DiagnosticKind::Persistence, e.to_string());
                self.status.send_modify(|status| {
                    status.failed_writes += 1;
                    status.last_failure = Some(diagnostic);
                });
            }
        }
    }
}

/// Owner of a running writer task
///
/// Dropping the handle aborts the task, so no write can fire for a session that is gone.
#[derive(Debug)]
pub struct WriterHandle {
    commands: mpsc::UnboundedSender<WriterCommand>,
    status: watch::Receiver<WriterStatus>,
    task: Option<JoinHandle<()>>,
}

impl WriterHandle {
    /// Spawns the writer for one (user, item) pair on the current runtime
    pub fn spawn(
        store: Arc<dyn ProgressStore>,
        user_id: UserId,
        item_id: ItemId,
        debounce_window: Duration,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(WriterStatus::default());

        let writer = ProgressWriter {
            store,
            user_id,
            item_id,
            debouncer: Debouncer::new(debounce_window).with_max_wait(debounce_window),
            commands: commands_rx,
            status: status_tx,
        };

        Self {
            commands: commands_tx,
            status: status_rx,
            task: Some(tokio::spawn(writer.run())),
        }
    }

    /// Schedules a debounced write of `snapshot`, superseding any pending one
    pub fn notify(&self, snapshot: PlaybackSnapshot) -> EngineResult<()> {
        self.send(WriterCommand::Notify(snapshot))
    }

    /// Writes `snapshot` as soon as any in-flight write settles
    pub fn commit(&self, snapshot: PlaybackSnapshot) -> EngineResult<()> {
        self.send(WriterCommand::Commit(snapshot))
    }

    /// Waits until every request sent so far has been handled
    ///
    /// A debounced write still inside its window stays pending.
    pub async fn settled(&self) -> EngineResult<WriterStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(WriterCommand::Settle(reply_tx))?;
        reply_rx.await.map_err(|_| EngineError::WriterStopped)
    }

    /// Latest status without waiting
    pub fn status(&self) -> WriterStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn subscribe(&self) -> watch::Receiver<WriterStatus> {
        self.status.clone()
    }

    /// Cancels the pending debounced write, optionally commits a final snapshot, and waits for
    /// the task to exit
    pub async fn shutdown(mut self, final_snapshot: Option<PlaybackSnapshot>) -> WriterStatus {
        let _ = self.commands.send(WriterCommand::Shutdown(final_snapshot));
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Progress writer task failed: {}", e);
            }
        }
        self.status.borrow().clone()
    }

    fn send(&self, command: WriterCommand) -> EngineResult<()> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::WriterStopped)
    }
}

impl Drop for WriterHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
