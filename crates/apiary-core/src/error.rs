//! Error types for apiary-core
//!
//! One enum covers the whole engine. Variants fall into four groups, which
//! map onto process exit codes the same way across the CLI:
//!
//! - **Validation** (exit 1): bad input, bad identifiers, bad config
//! - **System** (exit 2): storage, IO, the inspection service
//! - **Not found** (exit 3): unknown batch or hive
//! - **Invalid state** (exit 4): the batch is not in a state that allows the call
//!
//! Every validation failure is raised before anything is written.

use thiserror::Error;

use crate::domain::{
    identifiers::{BatchId, HiveId, IdentifierError},
    status::{BatchStatus, TransitionError},
};

/// Core error type for batch inspection operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("batch '{0}' not found")]
    BatchNotFound(BatchId),

    #[error("batch has already been started (status: {0})")]
    BatchAlreadyStarted(BatchStatus),

    #[error("batch has no active hives to inspect")]
    EmptyBatch,

    #[error("batch is not in progress (status: {0})")]
    BatchNotInProgress(BatchStatus),

    /// Ordering edits on a batch that has already finished.
    #[error("batch is completed and read-only")]
    BatchCompleted,

    #[error("batch has no current hive")]
    NoCurrentSlot,

    #[error("hive '{0}' is not part of this batch")]
    SlotNotFound(HiveId),

    #[error("hive '{0}' has already been inspected")]
    SlotAlreadyCompleted(HiveId),

    #[error("hive '{0}' has already been cancelled")]
    SlotAlreadyCancelled(HiveId),

    #[error("hive '{0}' appears more than once")]
    DuplicateHive(HiveId),

    #[error("invalid reorder: {0}")]
    InvalidReorder(String),

    /// Another writer persisted the batch first. The caller should reload and retry.
    #[error("batch '{batch}' was modified concurrently (expected version {expected})")]
    ConcurrentModification { batch: BatchId, expected: u64 },

    /// The inspection service failed or timed out. No local state changed.
    #[error("inspection service failed: {0}")]
    UpstreamInspectionCreationFailed(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// Persisted state violates an aggregate invariant.
    #[error("corrupt batch state: {0}")]
    CorruptState(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// Stable machine-readable code, used in JSON output and HTTP problem bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BatchNotFound(_) => "BATCH_NOT_FOUND",
            Self::BatchAlreadyStarted(_) => "BATCH_ALREADY_STARTED",
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::BatchNotInProgress(_) => "BATCH_NOT_IN_PROGRESS",
            Self::BatchCompleted => "BATCH_COMPLETED",
            Self::NoCurrentSlot => "NO_CURRENT_SLOT",
            Self::SlotNotFound(_) => "SLOT_NOT_FOUND",
            Self::SlotAlreadyCompleted(_) => "SLOT_ALREADY_COMPLETED",
            Self::SlotAlreadyCancelled(_) => "SLOT_ALREADY_CANCELLED",
            Self::DuplicateHive(_) => "DUPLICATE_HIVE",
            Self::InvalidReorder(_) => "INVALID_REORDER",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::UpstreamInspectionCreationFailed(_) => "UPSTREAM_INSPECTION_CREATION_FAILED",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Parse(_) => "PARSE_ERROR",
            Self::CorruptState(_) => "CORRUPT_STATE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit code scheme:
    /// - 1: User error (validation, invalid input, bad configuration)
    /// - 2: System error (IO, database, inspection service)
    /// - 3: Not found (batch or hive)
    /// - 4: Invalid state (wrong lifecycle state, conflicts, corruption)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DuplicateHive(_)
            | Self::InvalidReorder(_)
            | Self::InvalidIdentifier(_)
            | Self::InvalidConfig(_)
            | Self::Parse(_) => 1,
            Self::UpstreamInspectionCreationFailed(_) | Self::Database(_) | Self::Io(_) => 2,
            Self::BatchNotFound(_) | Self::SlotNotFound(_) => 3,
            Self::BatchAlreadyStarted(_)
            | Self::EmptyBatch
            | Self::BatchNotInProgress(_)
            | Self::BatchCompleted
            | Self::NoCurrentSlot
            | Self::SlotAlreadyCompleted(_)
            | Self::SlotAlreadyCancelled(_)
            | Self::ConcurrentModification { .. }
            | Self::InvalidTransition(_)
            | Self::CorruptState(_) => 4,
        }
    }

    /// True for failures a caller may resolve by simply trying again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::UpstreamInspectionCreationFailed(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(format!("Failed to parse config: {err}"))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for apiary-core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let conflict = Error::ConcurrentModification {
            batch: BatchId::generate(),
            expected: 3,
        };
        assert!(conflict.is_retryable());
        assert!(Error::UpstreamInspectionCreationFailed("timeout".into()).is_retryable());
        assert!(!Error::NoCurrentSlot.is_retryable());
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::InvalidReorder("x".into()).exit_code(), 1);
        assert_eq!(Error::Database("locked".into()).exit_code(), 2);
        assert_eq!(Error::BatchNotFound(BatchId::generate()).exit_code(), 3);
        assert_eq!(Error::BatchCompleted.exit_code(), 4);
    }

    #[test]
    fn test_display_includes_context() {
        let hive = HiveId::parse("H2").expect("valid hive id");
        let err = Error::SlotAlreadyCompleted(hive);
        assert_eq!(err.to_string(), "hive 'H2' has already been inspected");
        assert_eq!(err.code(), "SLOT_ALREADY_COMPLETED");
    }

    #[test]
    fn test_transition_error_converts() {
        let err: Error = TransitionError {
            from: BatchStatus::Completed,
            to: BatchStatus::InProgress,
        }
        .into();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }
}
