// crates/sync-engine/src/config.rs
//! Engine tuning

use earmark_core::{PlaybackRate, Volume};
use std::time::Duration;

/// Default quiet window before a debounced write fires
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(2000);

/// Default minimum time since the last write before a pause commits
pub const DEFAULT_COMMIT_THRESHOLD: Duration = Duration::from_millis(1000);

/// Default limit on the resume snapshot fetch
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration for a [`ProgressEngine`](crate::ProgressEngine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Trailing-edge debounce window for tick-driven writes
    pub debounce_window: Duration,
    /// Pauses within this long of the last write do not commit
    pub commit_threshold: Duration,
    /// Bootstrap gives up and starts from 0 after this long
    pub reconcile_timeout: Duration,
    /// Rate applied when there is nothing to resume
    pub default_rate: PlaybackRate,
    /// Volume applied when there is nothing to resume
    pub default_volume: Volume,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            commit_threshold: DEFAULT_COMMIT_THRESHOLD,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            default_rate: PlaybackRate::NORMAL,
            default_volume: Volume::MAX,
        }
    }
}

impl EngineConfig {
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_commit_threshold(mut self, threshold: Duration) -> Self {
        self.commit_threshold = threshold;
        self
    }

    pub fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    pub fn with_default_rate(mut self, rate: PlaybackRate) -> Self {
        self.default_rate = rate;
        self
    }

    pub fn with_default_volume(mut self, volume: Volume) -> Self {
        self.default_volume = volume;
        self
    }
}
