// crates/sync-engine/src/engine.rs
//! Playback progress engine
//!
//! The engine owns the local playback state for one (user, item) session and drives the state
//! machine `Idle -> Loading -> Ready -> Playing <-> Paused -> Ended`, with `Error` reachable from
//! any non-terminal state when the transport fails.
//!
//! The engine is single-threaded and event-driven: the caller forwards transport events through
//! [`ProgressEngine::handle_event`] and user commands through the control methods. Store I/O
//! happens in the writer task, so controls never wait on a save.

use crate::config::EngineConfig;
use crate::error::{Diagnostic, DiagnosticKind, EngineError, EngineResult, TransportError};
use crate::reconciler::fetch_snapshot;
use crate::transport::{MediaTransport, TransportAdapter, TransportEvent};
use crate::writer::{PlaybackSnapshot, WriterHandle, WriterStatus};
use earmark_core::{
    IdentityService, ItemId, PlaybackRate, ProgressRecord, ProgressStore, ResumePoint, UserId,
    Volume,
};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl EngineState {
    /// States in which the user can seek and change rate or volume
    pub fn accepts_controls(&self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }

    /// Ended and Error are terminal for a session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Error)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Ready => "Ready",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
            Self::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

/// Callback receiving progress as a percentage in `0..=100`
pub type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// Percentage of `position` within `duration`, 0 while the duration is unknown
pub fn progress_percent(position: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(duration) if duration.is_finite() && duration > 0.0 && position.is_finite() => {
            (position / duration * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Orchestrates transport, reconciliation and persistence for one listening session
pub struct ProgressEngine<T: MediaTransport> {
    config: EngineConfig,
    user_id: Option<UserId>,
    item_id: ItemId,
    source_url: String,
    store: Arc<dyn ProgressStore>,
    transport: TransportAdapter<T>,
    writer: Option<WriterHandle>,
    state: EngineState,

    position: f64,
    duration: Option<f64>,
    rate: PlaybackRate,
    volume: Volume,
    muted: bool,

    reconciled: bool,
    pending_resume: Option<ResumePoint>,
    resume_applied: bool,
    snapshot: Option<ProgressRecord>,
    last_commit_at: Option<Instant>,

    diagnostics: Vec<Diagnostic>,
    on_progress: Option<ProgressCallback>,
}

impl<T: MediaTransport> ProgressEngine<T> {
    /// Creates an idle engine for `item_id`
    ///
    /// With `user_id == None` the engine is inert: playback works but nothing is resumed,
    /// accrued or saved.
    pub fn new(
        config: EngineConfig,
        user_id: Option<UserId>,
        item_id: ItemId,
        source_url: impl Into<String>,
        store: Arc<dyn ProgressStore>,
        transport: T,
    ) -> Self {
        let rate = config.default_rate;
        let volume = config.default_volume;

        Self {
            config,
            user_id,
            item_id,
            source_url: source_url.into(),
            store,
            transport: TransportAdapter::new(transport),
            writer: None,
            state: EngineState::Idle,
            position: 0.0,
            duration: None,
            rate,
            volume,
            muted: false,
            reconciled: false,
            pending_resume: None,
            resume_applied: false,
            snapshot: None,
            last_commit_at: None,
            diagnostics: Vec::new(),
            on_progress: None,
        }
    }

    /// Creates an engine for whoever `identity` reports as signed in
    pub fn for_identity(
        config: EngineConfig,
        identity: &dyn IdentityService,
        item_id: ItemId,
        source_url: impl Into<String>,
        store: Arc<dyn ProgressStore>,
        transport: T,
    ) -> Self {
        Self::new(
            config,
            identity.current_user_id(),
            item_id,
            source_url,
            store,
            transport,
        )
    }

    /// Registers the progress callback, fired on every position update
    pub fn with_progress_callback(mut self, callback: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Loads the source and reconciles with the persisted snapshot
    ///
    /// A failed or slow snapshot fetch is recorded as a diagnostic and playback starts from 0.
    /// A transport failure moves the engine to `Error` and is returned.
    pub async fn start(&mut self) -> EngineResult<()> {
        if self.state != EngineState::Idle {
            return Err(self.invalid_state("start"));
        }
        self.transition(EngineState::Loading);

        self.duration = None;
        if let Err(e) = self.transport.reload(&self.source_url) {
            self.enter_error(e.to_string());
            return Err(e.into());
        }

        match self.user_id {
            Some(user_id) => {
                self.writer = Some(WriterHandle::spawn(
                    self.store.clone(),
                    user_id,
                    self.item_id,
                    self.config.debounce_window,
                ));

                match fetch_snapshot(
                    self.store.as_ref(),
                    user_id,
                    self.item_id,
                    self.config.reconcile_timeout,
                )
                .await
                {
                    Ok(record) => {
                        self.pending_resume = record.as_ref().map(ProgressRecord::resume_point);
                        self.snapshot = record;
                    }
                    Err(e) => {
                        log::warn!("Starting {} from 0: {}", self.item_id, e);
                        self.report(DiagnosticKind::Reconcile, e.to_string());
                    }
                }
            }
            None => log::info!("No signed-in user; progress for {} will not be saved", self.item_id),
        }

        self.reconciled = true;
        self.try_ready()
    }

    /// Applies one transport event
    pub fn handle_event(&mut self, event: TransportEvent) -> EngineResult<()> {
        match event {
            TransportEvent::MetadataReady { duration } => {
                if self.state.is_terminal() {
                    return Ok(());
                }
                self.duration = Some(duration);
                self.transport.metadata_ready(duration);
                self.try_ready()
            }
            TransportEvent::Tick { position } => {
                if !matches!(
                    self.state,
                    EngineState::Ready | EngineState::Playing | EngineState::Paused
                ) {
                    log::trace!("Ignoring tick at {:.1}s while {}", position, self.state);
                    return Ok(());
                }
                self.position = position.max(0.0);
                self.emit_progress();
                self.notify_writer()
            }
            TransportEvent::Ended => {
                if !matches!(self.state, EngineState::Playing | EngineState::Paused) {
                    return Ok(());
                }
                match self.duration {
                    Some(duration) => self.position = duration,
                    None => self.refresh_position(),
                }
                self.transition(EngineState::Ended);
                self.emit_progress();
                self.commit_now()
            }
            TransportEvent::Error { reason } => {
                if self.state.is_terminal() {
                    return Ok(());
                }
                self.enter_error(reason);
                Ok(())
            }
        }
    }

    /// Starts or resumes playback
    pub fn play(&mut self) -> EngineResult<()> {
        match self.state {
            EngineState::Playing => Ok(()),
            EngineState::Ready | EngineState::Paused => {
                self.guarded(|transport| transport.play())?;
                self.transition(EngineState::Playing);
                Ok(())
            }
            _ => Err(self.invalid_state("play")),
        }
    }

    /// Pauses playback, committing when the last save is older than the threshold
    pub fn pause(&mut self) -> EngineResult<()> {
        match self.state {
            EngineState::Paused | EngineState::Ready => Ok(()),
            EngineState::Playing => {
                self.guarded(|transport| transport.pause())?;
                self.transition(EngineState::Paused);
                self.refresh_position();
                if self.commit_due() {
                    self.commit_now()?;
                }
                Ok(())
            }
            _ => Err(self.invalid_state("pause")),
        }
    }

    /// Moves the playhead, clamped to `[0, duration]`
    pub fn seek(&mut self, seconds: f64) -> EngineResult<()> {
        self.check_controls("seek")?;
        let target = self.clamp_position(seconds);
        self.guarded(|transport| transport.seek(target))?;
        self.position = target;
        self.emit_progress();
        self.notify_writer()
    }

    /// Seeks relative to the current position
    pub fn skip(&mut self, delta_seconds: f64) -> EngineResult<()> {
        self.seek(self.position + delta_seconds)
    }

    pub fn set_rate(&mut self, rate: PlaybackRate) -> EngineResult<()> {
        self.check_controls("set rate")?;
        self.guarded(|transport| transport.set_rate(rate.value()))?;
        self.rate = rate;
        self.notify_writer()
    }

    pub fn set_volume(&mut self, volume: Volume) -> EngineResult<()> {
        self.check_controls("set volume")?;
        self.guarded(|transport| transport.set_volume(volume.value()))?;
        self.volume = volume;
        self.notify_writer()
    }

    /// Mutes or unmutes output; mute is never saved
    pub fn set_muted(&mut self, muted: bool) -> EngineResult<()> {
        self.check_controls("mute")?;
        self.guarded(|transport| transport.set_muted(muted))?;
        self.muted = muted;
        Ok(())
    }

    /// Ends the session
    ///
    /// The pending debounced write is cancelled. When playback got past loading without an
    /// error the transport's current playhead is committed. Returns once the writer has stopped.
    pub async fn teardown(mut self) -> Option<WriterStatus> {
        let final_snapshot = match self.state {
            EngineState::Ready | EngineState::Playing | EngineState::Paused => {
                self.refresh_position();
                Some(self.current_snapshot())
            }
            EngineState::Ended => Some(self.current_snapshot()),
            _ => None,
        };

        let writer = self.writer.take()?;
        let status = writer.shutdown(final_snapshot).await;
        log::debug!(
            "Session for {} closed after {} writes ({} failed)",
            self.item_id,
            status.writes,
            status.failed_writes
        );
        Some(status)
    }

    /// Waits for every requested write to be handled and returns the writer status
    ///
    /// `None` when the engine is inert or not started.
    pub async fn settled(&self) -> EngineResult<Option<WriterStatus>> {
        match &self.writer {
            Some(writer) => writer.settled().await.map(Some),
            None => Ok(None),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// True when nothing will be persisted for this session
    pub fn is_inert(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Current progress in `0..=100`
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.position, self.duration)
    }

    /// The most recent record known to the engine
    ///
    /// A successful write supersedes the snapshot fetched at start.
    pub fn record(&self) -> Option<ProgressRecord> {
        self.writer
            .as_ref()
            .and_then(|writer| writer.status().record)
            .or_else(|| self.snapshot.clone())
    }

    /// Completion flag from the last known record; never set by the engine
    pub fn is_completed(&self) -> bool {
        self.record().map(|record| record.is_completed).unwrap_or(false)
    }

    /// Problems recorded during the session, oldest first, then the latest failed write
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.clone();
        if let Some(failure) = self
            .writer
            .as_ref()
            .and_then(|writer| writer.status().last_failure)
        {
            diagnostics.push(failure);
        }
        diagnostics
    }

    /// Borrows the underlying transport
    pub fn transport(&self) -> &T {
        self.transport.inner()
    }

    /// Mutably borrows the underlying transport to drive it
    pub fn transport_mut(&mut self) -> &mut T {
        self.transport.inner_mut()
    }

    fn try_ready(&mut self) -> EngineResult<()> {
        if self.state != EngineState::Loading || !self.reconciled || self.duration.is_none() {
            return Ok(());
        }

        if !self.resume_applied {
            self.resume_applied = true;
            let resume = self.pending_resume.take().unwrap_or_else(|| {
                ResumePoint::new(0.0, self.config.default_rate, self.config.default_volume)
            });
            self.apply_resume(resume)?;
        }

        self.transition(EngineState::Ready);
        self.emit_progress();
        Ok(())
    }

    fn apply_resume(&mut self, resume: ResumePoint) -> EngineResult<()> {
        let position = self.clamp_position(resume.position);
        if position > 0.0 {
            self.guarded(|transport| transport.seek(position))?;
        }
        self.guarded(|transport| transport.set_rate(resume.rate.value()))?;
        self.guarded(|transport| transport.set_volume(resume.volume.value()))?;

        self.position = position;
        self.rate = resume.rate;
        self.volume = resume.volume;
        log::debug!(
            "Applied resume point {:.0}s x{} vol {} to {}",
            position,
            resume.rate.value(),
            resume.volume.value(),
            self.item_id
        );
        Ok(())
    }

    /// Catches up with the transport's playhead, which may have moved since the last tick
    fn refresh_position(&mut self) {
        let position = self.transport.position();
        if position.is_finite() {
            self.position = self.clamp_position(position);
        }
    }

    fn commit_due(&self) -> bool {
        let last = match (
            self.last_commit_at,
            self.writer.as_ref().and_then(|w| w.status().last_write_at),
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        last.map(|at| at.elapsed() > self.config.commit_threshold)
            .unwrap_or(true)
    }

    fn commit_now(&mut self) -> EngineResult<()> {
        let snapshot = self.current_snapshot();
        match &self.writer {
            Some(writer) => {
                self.last_commit_at = Some(Instant::now());
                writer.commit(snapshot)
            }
            None => Ok(()),
        }
    }

    fn notify_writer(&self) -> EngineResult<()> {
        match &self.writer {
            Some(writer) => writer.notify(self.current_snapshot()),
            None => Ok(()),
        }
    }

    fn current_snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot::new(self.position, self.rate, self.volume)
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        let lower = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        match self.duration {
            Some(duration) => lower.min(duration),
            None => lower,
        }
    }

    fn check_controls(&self, operation: &'static str) -> EngineResult<()> {
        match self.state {
            EngineState::Error => Err(EngineError::ControlsDisabled(
                self.transport
                    .failure()
                    .unwrap_or("playback error")
                    .to_string(),
            )),
            state if state.accepts_controls() => Ok(()),
            _ => Err(self.invalid_state(operation)),
        }
    }

    /// Runs a transport control, entering `Error` if the transport fails terminally
    fn guarded(
        &mut self,
        op: impl FnOnce(&mut TransportAdapter<T>) -> Result<(), TransportError>,
    ) -> EngineResult<()> {
        if self.state == EngineState::Error {
            return self.check_controls("control");
        }
        match op(&mut self.transport) {
            Ok(()) => Ok(()),
            Err(e) => {
                if self.transport.is_failed() {
                    self.enter_error(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    fn enter_error(&mut self, reason: String) {
        log::error!("Playback of {} failed: {}", self.item_id, reason);
        self.transport.fail(reason.clone());
        self.report(DiagnosticKind::Transport, reason);
        self.transition(EngineState::Error);
    }

    fn emit_progress(&mut self) {
        let percent = self.progress_percent();
        if let Some(callback) = self.on_progress.as_mut() {
            callback(percent);
        }
    }

    fn report(&mut self, kind: DiagnosticKind, message: String) {
        self.diagnostics.push(Diagnostic::new(kind, message));
    }

    fn transition(&mut self, next: EngineState) {
        if self.state != next {
            log::debug!("{}: {} -> {}", self.item_id, self.state, next);
            self.state = next;
        }
    }

    fn invalid_state(&self, operation: &'static str) -> EngineError {
        if self.state == EngineState::Error {
            return EngineError::ControlsDisabled(
                self.transport
                    .failure()
                    .unwrap_or("playback error")
                    .to_string(),
            );
        }
        EngineError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}

impl<T: MediaTransport + fmt::Debug> fmt::Debug for ProgressEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEngine")
            .field("user_id", &self.user_id)
            .field("item_id", &self.item_id)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("duration", &self.duration)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}
