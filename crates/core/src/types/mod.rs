//! Domain types for earmark
//!
//! This module contains all domain models organized by responsibility:
//! - `identity`: user and item identifiers
//! - `playback`: playback rate, volume and the resume point
//! - `progress`: the persisted progress record and write patches
//! - `stats`: per-user listening statistics
//! - `common`: shared traits and utilities

mod common;
mod identity;
mod playback;
mod progress;
mod stats;

// Re-export all public types
pub use common::{format_hms, Timestamp, Validator};
pub use identity::{ItemId, UserId};
pub use playback::{PlaybackRate, ResumePoint, Volume};
pub use progress::{listen_time_delta, round_position, ProgressPatch, ProgressRecord};
pub use stats::ProgressSummary;
