// crates/sync-engine/src/error.rs
//! Error types for the playback progress engine

use earmark_core::{AppError, Timestamp};
use std::fmt;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures of the media transport
///
/// Any failure reported by the underlying primitive is terminal for the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Media byte-stream could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Media byte-stream could not be fetched
    #[error("Network error: {0}")]
    Network(String),

    /// Controls are disabled after a playback error
    #[error("Transport disabled after playback error: {0}")]
    Disabled(String),

    /// Seek issued before the duration is known
    #[error("Metadata not ready")]
    MetadataNotReady,

    /// No source has been loaded
    #[error("No source loaded")]
    NoSource,

    /// Rejected control value
    #[error("Invalid {control}: {value}")]
    InvalidValue { control: &'static str, value: f64 },
}

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Playback failure; the session is in the error state
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Resume snapshot could not be fetched
    #[error("Reconcile failed: {0}")]
    Reconcile(String),

    /// A durable write failed
    #[error("Persistence failed: {0}")]
    Persistence(#[from] AppError),

    /// Controls are disabled in the error state
    #[error("Controls disabled: {0}")]
    ControlsDisabled(String),

    /// Operation not allowed in the current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// The writer task is gone
    #[error("Progress writer stopped")]
    WriterStopped,
}

/// Category of a non-fatal problem the engine recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Reconcile,
    Persistence,
    Transport,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconcile => write!(f, "reconcile"),
            Self::Persistence => write!(f, "persistence"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

/// A reported problem that did not interrupt listening
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub at: Timestamp,
}

impl Diagnostic {
    /// Creates a diagnostic stamped with the current time
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Timestamp::now(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Decode("bad frame".to_string());
        assert!(err.to_string().contains("bad frame"));

        let err = TransportError::InvalidValue {
            control: "rate",
            value: -1.0,
        };
        assert_eq!(err.to_string(), "Invalid rate: -1");
    }

    #[test]
    fn test_engine_error_from_transport() {
        let err: EngineError = TransportError::MetadataNotReady.into();
        assert!(matches!(err, EngineError::Transport(_)));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = EngineError::InvalidState {
            operation: "seek",
            state: "Loading".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot seek while Loading");
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::new(DiagnosticKind::Persistence, "store offline");
        assert_eq!(diagnostic.to_string(), "[persistence] store offline");
    }
}
