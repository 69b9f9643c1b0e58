//! Batch and slot status state machines (pure domain logic)
//!
//! # Batch lifecycle
//!
//! ```text
//! draft -> in_progress -> completed
//! ```
//!
//! `completed` is terminal. There is no reopen edge.
//!
//! # Slot lifecycle
//!
//! ```text
//! pending -> completed
//!    |
//!    v
//! cancelled
//! ```
//!
//! Skipping a slot is a position change, never a status change.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Error;

/// Error type for invalid batch state transitions.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid batch transition: cannot transition from {from} to {to}")]
pub struct TransitionError {
    pub from: BatchStatus,
    pub to: BatchStatus,
}

/// Lifecycle state of a batch inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Created, hives may be reordered or cancelled, nothing inspected yet.
    Draft,
    /// The beekeeper is walking the hives.
    InProgress,
    /// No pending hives remain. Read-only.
    Completed,
}

impl BatchStatus {
    /// Returns the string representation of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Returns true if this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true while the slot ordering may still be edited.
    #[must_use]
    pub const fn accepts_ordering_changes(&self) -> bool {
        matches!(self, Self::Draft | Self::InProgress)
    }

    /// Returns true if a transition from `self` to `target` is valid.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        self.validate_transition(target).is_ok()
    }

    /// Validates that a transition from `self` to `target` is allowed.
    ///
    /// Self-transitions are rejected: every edge of this machine carries a
    /// timestamp side effect, so repeating one would be a bug.
    pub fn validate_transition(&self, target: Self) -> std::result::Result<(), TransitionError> {
        let is_valid = matches!(
            (self, target),
            (Self::Draft, Self::InProgress) | (Self::InProgress, Self::Completed)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError {
                from: *self,
                to: target,
            })
        }
    }

    /// Returns all batch statuses.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Draft, Self::InProgress, Self::Completed]
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(Error::CorruptState(format!("Invalid batch status: {s}"))),
        }
    }
}

/// Status of a single hive slot within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Waiting to be inspected (possibly after being skipped).
    Pending,
    /// Inspected; the slot carries the inspection id.
    Completed,
    /// Permanently removed from the walk.
    Cancelled,
}

impl SlotStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled slots never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Active slots take part in the traversal order.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(Error::CorruptState(format!("Invalid slot status: {s}"))),
        }
    }
}
