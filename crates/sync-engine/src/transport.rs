// crates/sync-engine/src/transport.rs
//! Media transport contract
//!
//! [`MediaTransport`] is the platform playback primitive. The engine never talks to it
//! directly; it goes through [`TransportAdapter`], which enforces two rules:
//! - seeks before metadata is ready are rejected so the caller defers them
//! - after any playback error every control fails until the source is reloaded

use crate::error::{TransportError, TransportResult};

/// Events a transport reports to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Periodic position report while playing
    Tick { position: f64 },
    /// Duration is known and seeking is allowed
    MetadataReady { duration: f64 },
    /// Playback reached the end of the media
    Ended,
    /// Decode or network failure on the media stream
    Error { reason: String },
}

/// Platform audio playback primitive
pub trait MediaTransport: Send {
    /// Opens a media source
    fn load(&mut self, source_url: &str) -> TransportResult<()>;

    fn play(&mut self) -> TransportResult<()>;

    fn pause(&mut self) -> TransportResult<()>;

    /// Moves the playhead to `seconds`
    fn seek(&mut self, seconds: f64) -> TransportResult<()>;

    fn set_rate(&mut self, rate: f64) -> TransportResult<()>;

    fn set_volume(&mut self, volume: f64) -> TransportResult<()>;

    fn set_muted(&mut self, muted: bool) -> TransportResult<()>;

    /// Current playhead in seconds
    fn position(&self) -> f64;

    /// Media duration, `None` until metadata is ready
    fn duration(&self) -> Option<f64>;
}

/// Guards a [`MediaTransport`] with metadata and failure tracking
#[derive(Debug)]
pub struct TransportAdapter<T> {
    inner: T,
    duration: Option<f64>,
    failure: Option<String>,
}

impl<T: MediaTransport> TransportAdapter<T> {
    /// Wraps a transport
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            duration: None,
            failure: None,
        }
    }

    /// Loads a source, clearing any previous failure
    pub fn reload(&mut self, source_url: &str) -> TransportResult<()> {
        self.failure = None;
        self.duration = None;
        self.guard(|inner| inner.load(source_url))
    }

    /// Records that metadata is available
    pub fn metadata_ready(&mut self, duration: f64) {
        self.duration = Some(duration);
    }

    /// Marks the transport as failed, disabling controls
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
    }

    /// Returns the failure reason, if any
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn play(&mut self) -> TransportResult<()> {
        self.guard(|inner| inner.play())
    }

    pub fn pause(&mut self) -> TransportResult<()> {
        self.guard(|inner| inner.pause())
    }

    /// Seeks once the duration is known
    pub fn seek(&mut self, seconds: f64) -> TransportResult<()> {
        if self.failure.is_none() && self.duration.is_none() {
            return Err(TransportError::MetadataNotReady);
        }
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(TransportError::InvalidValue {
                control: "position",
                value: seconds,
            });
        }
        self.guard(|inner| inner.seek(seconds))
    }

    pub fn set_rate(&mut self, rate: f64) -> TransportResult<()> {
        self.guard(|inner| inner.set_rate(rate))
    }

    pub fn set_volume(&mut self, volume: f64) -> TransportResult<()> {
        self.guard(|inner| inner.set_volume(volume))
    }

    pub fn set_muted(&mut self, muted: bool) -> TransportResult<()> {
        self.guard(|inner| inner.set_muted(muted))
    }

    /// Current playhead reported by the transport
    pub fn position(&self) -> f64 {
        self.inner.position()
    }

    /// Known duration, from the metadata event or the transport itself
    pub fn duration(&self) -> Option<f64> {
        self.duration.or_else(|| self.inner.duration())
    }

    /// Borrows the wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Mutably borrows the wrapped transport, bypassing the guards
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    fn guard<R>(
        &mut self,
        op: impl FnOnce(&mut T) -> TransportResult<R>,
    ) -> TransportResult<R> {
        if let Some(reason) = &self.failure {
            return Err(TransportError::Disabled(reason.clone()));
        }

        match op(&mut self.inner) {
            Ok(value) => Ok(value),
            Err(err @ (TransportError::Decode(_) | TransportError::Network(_))) => {
                self.failure = Some(err.to_string());
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// In-process transport that plays a silent item of a fixed length
///
/// Time only moves when [`SimulatedTransport::advance`] is called, which makes it suitable for
/// tests and for driving the engine from the command line.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    source: Option<String>,
    duration: f64,
    metadata_ready: bool,
    position: f64,
    playing: bool,
    rate: f64,
    volume: f64,
    muted: bool,
    fail_on_load: Option<TransportError>,
}

impl SimulatedTransport {
    /// Creates a transport for an item of `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            source: None,
            duration: duration.max(0.0),
            metadata_ready: false,
            position: 0.0,
            playing: false,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            fail_on_load: None,
        }
    }

    /// Makes the next `load` fail with `error`
    pub fn with_load_failure(mut self, error: TransportError) -> Self {
        self.fail_on_load = Some(error);
        self
    }

    /// Finishes loading and reports the duration
    pub fn finish_loading(&mut self) -> TransportEvent {
        self.metadata_ready = true;
        TransportEvent::MetadataReady {
            duration: self.duration,
        }
    }

    /// Plays for `seconds` of wall time, returning the events produced
    ///
    /// The playhead moves by `seconds * rate`. Reaching the end emits a final tick and `Ended`.
    pub fn advance(&mut self, seconds: f64) -> Vec<TransportEvent> {
        if !self.playing || seconds <= 0.0 {
            return Vec::new();
        }

        self.position = (self.position + seconds * self.rate).min(self.duration);
        let mut events = vec![TransportEvent::Tick {
            position: self.position,
        }];

        if self.position >= self.duration {
            self.playing = false;
            events.push(TransportEvent::Ended);
        }

        events
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

impl MediaTransport for SimulatedTransport {
    fn load(&mut self, source_url: &str) -> TransportResult<()> {
        if let Some(error) = self.fail_on_load.take() {
            return Err(error);
        }
        self.source = Some(source_url.to_string());
        self.metadata_ready = false;
        self.position = 0.0;
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) -> TransportResult<()> {
        if self.source.is_none() {
            return Err(TransportError::NoSource);
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> TransportResult<()> {
        self.playing = false;
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> TransportResult<()> {
        if !self.metadata_ready {
            return Err(TransportError::MetadataNotReady);
        }
        self.position = seconds.clamp(0.0, self.duration);
        Ok(())
    }

    fn set_rate(&mut self, rate: f64) -> TransportResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TransportError::InvalidValue {
                control: "rate",
                value: rate,
            });
        }
        self.rate = rate;
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> TransportResult<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(TransportError::InvalidValue {
                control: "volume",
                value: volume,
            });
        }
        self.volume = volume;
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> TransportResult<()> {
        self.muted = muted;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.metadata_ready.then_some(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(duration: f64) -> TransportAdapter<SimulatedTransport> {
        let mut adapter = TransportAdapter::new(SimulatedTransport::new(duration));
        adapter.reload("file:///book.mp3").unwrap();
        adapter
    }

    #[test]
    fn test_seek_before_metadata_is_rejected() {
        let mut adapter = loaded(100.0);
        assert_eq!(adapter.seek(10.0), Err(TransportError::MetadataNotReady));

        let event = adapter.inner_mut().finish_loading();
        assert_eq!(event, TransportEvent::MetadataReady { duration: 100.0 });
        adapter.metadata_ready(100.0);

        adapter.seek(10.0).unwrap();
        assert_eq!(adapter.position(), 10.0);
    }

    #[test]
    fn test_failure_disables_controls_until_reload() {
        let mut adapter = loaded(100.0);
        adapter.fail("decoder crashed");

        assert!(matches!(adapter.play(), Err(TransportError::Disabled(_))));
        assert!(matches!(adapter.set_volume(0.5), Err(TransportError::Disabled(_))));
        assert_eq!(adapter.failure(), Some("decoder crashed"));

        adapter.reload("file:///book.mp3").unwrap();
        assert!(!adapter.is_failed());
        adapter.play().unwrap();
    }

    #[test]
    fn test_decode_failure_is_terminal() {
        let mut adapter = TransportAdapter::new(
            SimulatedTransport::new(10.0)
                .with_load_failure(TransportError::Decode("bad header".to_string())),
        );

        assert!(adapter.reload("file:///broken.mp3").is_err());
        assert!(adapter.is_failed());
        assert!(matches!(adapter.play(), Err(TransportError::Disabled(_))));
    }

    #[test]
    fn test_invalid_value_does_not_fail_transport() {
        let mut adapter = loaded(100.0);
        assert!(adapter.set_rate(0.0).is_err());
        assert!(!adapter.is_failed());
        adapter.set_rate(1.5).unwrap();
        assert_eq!(adapter.inner().rate(), 1.5);
    }

    #[test]
    fn test_advance_emits_ticks_and_end() {
        let mut transport = SimulatedTransport::new(10.0);
        transport.load("file:///short.mp3").unwrap();
        transport.finish_loading();

        assert!(transport.advance(1.0).is_empty());

        transport.play().unwrap();
        transport.set_rate(2.0).unwrap();
        assert_eq!(
            transport.advance(2.0),
            vec![TransportEvent::Tick { position: 4.0 }]
        );

        let events = transport.advance(10.0);
        assert_eq!(
            events,
            vec![
                TransportEvent::Tick { position: 10.0 },
                TransportEvent::Ended
            ]
        );
        assert!(!transport.is_playing());
    }

    #[test]
    fn test_duration_hidden_until_loaded() {
        let mut transport = SimulatedTransport::new(30.0);
        transport.load("file:///a.mp3").unwrap();
        assert_eq!(transport.duration(), None);
        transport.finish_loading();
        assert_eq!(transport.duration(), Some(30.0));
    }
}
