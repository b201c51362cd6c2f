//! Per-user listening statistics

use crate::types::{ItemId, ProgressRecord};
use std::collections::HashMap;

/// Listening statistics across every item a user has progress on
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    pub item_progress: HashMap<ItemId, ProgressRecord>,
    pub completed_items: usize,
    /// Sum over items of whole minutes listened (each item floored separately)
    pub total_minutes_listened: u64,
}

impl ProgressSummary {
    /// Creates empty statistics
    pub fn empty() -> Self {
        Self {
            item_progress: HashMap::new(),
            completed_items: 0,
            total_minutes_listened: 0,
        }
    }

    /// Builds the summary from a user's records
    pub fn from_records(records: impl IntoIterator<Item = ProgressRecord>) -> Self {
        let mut summary = Self::empty();

        for record in records {
            if record.is_completed {
                summary.completed_items += 1;
            }
            summary.total_minutes_listened +=
                (record.total_listen_time_seconds.max(0.0) / 60.0).floor() as u64;
            summary.item_progress.insert(record.item_id, record);
        }

        summary
    }

    /// Number of items with any progress
    pub fn started_items(&self) -> usize {
        self.item_progress.len()
    }

    /// Number of started items not yet completed
    pub fn in_progress_items(&self) -> usize {
        self.started_items() - self.completed_items
    }
}

impl Default for ProgressSummary {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlaybackRate, ProgressPatch, Timestamp, UserId, Volume};

    fn record(user: UserId, total: f64, completed: bool) -> ProgressRecord {
        let patch = ProgressPatch::compute(
            None,
            total,
            PlaybackRate::NORMAL,
            Volume::MAX,
            Timestamp::now(),
        );
        let mut record = ProgressRecord::create(user, ItemId::new(), &patch);
        if completed {
            record.mark_completed(Timestamp::now());
        }
        record
    }

    #[test]
    fn test_empty_summary() {
        let summary = ProgressSummary::empty();
        assert_eq!(summary.started_items(), 0);
        assert_eq!(summary.completed_items, 0);
        assert_eq!(summary.total_minutes_listened, 0);
    }

    #[test]
    fn test_minutes_are_floored_per_item() {
        let user = UserId::new();
        // 90s + 90s = 3 minutes, but each item floors to 1 minute
        let summary = ProgressSummary::from_records(vec![
            record(user, 90.0, false),
            record(user, 90.0, false),
        ]);
        assert_eq!(summary.total_minutes_listened, 2);
    }

    #[test]
    fn test_completed_count() {
        let user = UserId::new();
        let summary = ProgressSummary::from_records(vec![
            record(user, 600.0, true),
            record(user, 60.0, false),
            record(user, 3600.0, true),
        ]);
        assert_eq!(summary.completed_items, 2);
        assert_eq!(summary.in_progress_items(), 1);
        assert_eq!(summary.total_minutes_listened, 71);
    }
}
