//! Core domain types and collaborator contracts for earmark
//!
//! This crate is shared by the store implementations and the sync engine:
//! - `types`: identifiers, progress records, resume points and statistics
//! - `error`: the application-wide error taxonomy
//! - `store`: the Progress Store and Identity Service contracts

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use store::{IdentityService, ProgressStore, StaticIdentity};
pub use types::{
    format_hms, listen_time_delta, round_position, ItemId, PlaybackRate, ProgressPatch,
    ProgressRecord, ProgressSummary, ResumePoint, Timestamp, UserId, Validator, Volume,
};
