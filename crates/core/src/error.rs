//! Error types and recovery strategies for earmark
//!
//! Errors are classified in three severity tiers:
//! - **Recoverable**: the next write cycle can succeed (store unreachable, etc.)
//! - **Degraded**: a feature is skipped but listening continues (record missing, etc.)
//! - **Fatal**: the store is unusable until fixed (failed migration, etc.)
//!
//! Each error includes a recovery action to guide the caller.

use std::fmt;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Let the next scheduled write carry fresh state (no explicit retry)
    WaitForNextWrite,
    /// Skip the failing feature and continue (e.g., start from position 0)
    DisableFeature,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitForNextWrite => write!(f, "Waiting for next write"),
            Self::DisableFeature => write!(f, "Disabling feature"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be recovered from without user action
    Recoverable,
    /// Feature degraded but listening can continue
    Degraded,
    /// The store cannot be used until someone intervenes
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Errors raised by progress stores
#[derive(Error, Debug)]
pub enum AppError {
    /// A remote store could not be reached
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database operation failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A schema migration could not be applied
    #[error("Migration {version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },

    /// Record not found in the store
    #[error("Record not found: {entity} with {identifier}")]
    RecordNotFound { entity: String, identifier: String },

    /// Store state that should be impossible, such as a poisoned lock
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NetworkError { .. } | Self::DatabaseError { .. } => ErrorSeverity::Recoverable,
            Self::RecordNotFound { .. } => ErrorSeverity::Degraded,
            Self::MigrationFailed { .. } | Self::InternalError { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::NetworkError { .. } | Self::DatabaseError { .. } => {
                RecoveryAction::WaitForNextWrite
            }
            Self::RecordNotFound { .. } => RecoveryAction::DisableFeature,
            Self::MigrationFailed { .. } | Self::InternalError { .. } => {
                RecoveryAction::UserIntervention
            }
        }
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
