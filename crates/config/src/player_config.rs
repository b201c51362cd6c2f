//! Playback and progress persistence settings

use crate::error::ValidationError;
use crate::validation::{ConfigSection, Issues};
use serde::{Deserialize, Serialize};

/// Playback defaults and the timings of progress persistence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume applied when nothing was saved yet (0.0 - 1.0)
    pub default_volume: f64,

    /// Rate applied when nothing was saved yet
    pub default_rate: f64,

    /// Rates offered by the player's speed control
    pub rate_options: Vec<f64>,

    /// Quiet window before a tick-driven save
    pub persist_debounce_ms: u64,

    /// Pauses within this long of the last save do not save again
    pub commit_threshold_ms: u64,

    /// Give up on the resume lookup after this long
    pub reconcile_timeout_ms: u64,

    /// Skip forward/back step in seconds
    pub skip_seconds: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            default_rate: 1.0,
            rate_options: vec![0.75, 1.0, 1.25, 1.5, 2.0],
            persist_debounce_ms: 2000,
            commit_threshold_ms: 1000,
            reconcile_timeout_ms: 5000,
            skip_seconds: 10,
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn section_name(&self) -> &'static str {
        "player"
    }

    fn check(&self, issues: &mut Issues) {
        issues.range("player.default_volume", self.default_volume, 0.0, 1.0);
        issues.rate("player.default_rate", self.default_rate);
        issues.range("player.persist_debounce_ms", self.persist_debounce_ms, 100, 60_000);
        issues.range("player.commit_threshold_ms", self.commit_threshold_ms, 0, 60_000);
        issues.range("player.reconcile_timeout_ms", self.reconcile_timeout_ms, 100, 60_000);
        issues.range("player.skip_seconds", self.skip_seconds, 1, 600);

        if self.rate_options.is_empty() {
            issues.push(ValidationError::new("player.rate_options", "must not be empty"));
        }
        for rate in &self.rate_options {
            issues.rate("player.rate_options", *rate);
        }
    }
}
