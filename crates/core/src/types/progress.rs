//! Persisted listening progress
//!
//! A [`ProgressRecord`] exists once per (user, item). Writers never send a record; they send a
//! [`ProgressPatch`] computed against the record the store held at write time.

use crate::types::{ItemId, PlaybackRate, ResumePoint, Timestamp, UserId, Validator, Volume};

/// Rounds a transport position to the whole second that gets persisted
///
/// Negative and non-finite positions persist as 0.
pub fn round_position(position: f64) -> f64 {
    if position.is_finite() && position > 0.0 {
        position.round()
    } else {
        0.0
    }
}

/// Forward-only listen-time increment between two persisted positions
///
/// Rewinds contribute zero.
pub fn listen_time_delta(previous_position: f64, new_position: f64) -> f64 {
    (new_position - previous_position).max(0.0)
}

/// Durable progress for one user and one item
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub position_seconds: f64,
    pub playback_rate: PlaybackRate,
    pub volume: Volume,
    pub last_played_at: Timestamp,
    /// Monotonically non-decreasing over the record's lifetime
    pub total_listen_time_seconds: f64,
    /// Set by an external collaborator; never cleared by the engine
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
}

impl ProgressRecord {
    /// Creates the record produced by the first write for a (user, item) pair
    pub fn create(user_id: UserId, item_id: ItemId, patch: &ProgressPatch) -> Self {
        Self {
            user_id,
            item_id,
            position_seconds: patch.position_seconds,
            playback_rate: patch.playback_rate,
            volume: patch.volume,
            last_played_at: patch.last_played_at,
            total_listen_time_seconds: patch.total_listen_time_seconds,
            is_completed: false,
            completed_at: None,
        }
    }

    /// Applies a patch in place, leaving identity and completion untouched
    pub fn apply(&mut self, patch: &ProgressPatch) {
        self.position_seconds = patch.position_seconds;
        self.playback_rate = patch.playback_rate;
        self.volume = patch.volume;
        self.last_played_at = patch.last_played_at;
        self.total_listen_time_seconds = patch.total_listen_time_seconds;
    }

    /// Returns the resume point stored in this record
    pub fn resume_point(&self) -> ResumePoint {
        ResumePoint::new(self.position_seconds, self.playback_rate, self.volume)
    }

    /// Sets the completion flag once; later calls keep the first timestamp
    pub fn mark_completed(&mut self, at: Timestamp) {
        if !self.is_completed {
            self.is_completed = true;
            self.completed_at = Some(at);
        }
    }
}

impl Validator for ProgressRecord {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.position_seconds.is_finite() && self.position_seconds >= 0.0) {
            errors.push("Position must be >= 0".to_string());
        }

        if !(self.total_listen_time_seconds.is_finite() && self.total_listen_time_seconds >= 0.0)
        {
            errors.push("Total listen time must be >= 0".to_string());
        }

        if let Err(rate_errors) = self.playback_rate.validate() {
            errors.extend(rate_errors);
        }

        if let Err(volume_errors) = self.volume.validate() {
            errors.extend(volume_errors);
        }

        if self.completed_at.is_some() && !self.is_completed {
            errors.push("completed_at set on an incomplete record".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Fully computed values for one upsert
///
/// The store does not compute deltas; the writer supplies the new total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressPatch {
    pub position_seconds: f64,
    pub playback_rate: PlaybackRate,
    pub volume: Volume,
    pub last_played_at: Timestamp,
    pub total_listen_time_seconds: f64,
}

impl ProgressPatch {
    /// Computes the patch for a write of `position` against the record read at write time
    ///
    /// With no previous record the implicit previous position and total are both 0.
    pub fn compute(
        previous: Option<&ProgressRecord>,
        position: f64,
        rate: PlaybackRate,
        volume: Volume,
        now: Timestamp,
    ) -> Self {
        let rounded = round_position(position);
        let (previous_position, previous_total) = previous
            .map(|record| (record.position_seconds, record.total_listen_time_seconds))
            .unwrap_or((0.0, 0.0));

        Self {
            position_seconds: rounded,
            playback_rate: rate,
            volume,
            last_played_at: now,
            total_listen_time_seconds: previous_total
                + listen_time_delta(previous_position, rounded),
        }
    }

    /// Listen time this patch adds on top of `previous`
    pub fn delta_from(&self, previous: Option<&ProgressRecord>) -> f64 {
        let previous_total = previous
            .map(|record| record.total_listen_time_seconds)
            .unwrap_or(0.0);
        (self.total_listen_time_seconds - previous_total).max(0.0)
    }
}
