// crates/resilience/src/timeout.rs
//! Timeout handling for async operations

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Awaits an operation, failing if it does not complete within `duration`
///
/// The operation is dropped (cancelled) when the deadline passes.
pub async fn with_timeout<F, T>(duration: Duration, operation: F) -> ResilienceResult<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, operation)
        .await
        .map_err(|_| ResilienceError::Timeout(duration))
}
