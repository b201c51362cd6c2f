// crates/resilience/src/lib.rs
//! Timing primitives for rate-limited, fault-tolerant I/O
//!
//! This module provides:
//! - A trailing-edge debouncer with an optional max wait, owned by its caller
//! - Timeout handling for async operations
//!
//! # Example
//!
//! ```rust
//! use earmark_resilience::Debouncer;
//! use std::time::Duration;
//!
//! let mut debouncer = Debouncer::new(Duration::from_secs(2));
//! debouncer.schedule(10.0_f64);
//! debouncer.schedule(11.0_f64); // supersedes the first value
//! assert_eq!(debouncer.cancel(), Some(11.0));
//! ```

mod debounce;
mod error;
mod timeout;

pub use debounce::Debouncer;
pub use error::{ResilienceError, ResilienceResult};
pub use timeout::with_timeout;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: Debouncer<u32> = Debouncer::new(std::time::Duration::from_secs(2));
        let _: ResilienceResult<()> = Err(ResilienceError::Timeout(std::time::Duration::ZERO));
    }
}
