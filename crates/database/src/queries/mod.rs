//! Database query operations organized by entity

pub mod progress;

// Re-export commonly used query functions
pub use progress::{
    get_progress, get_user_summary, list_user_progress, mark_completed, upsert_progress,
};
