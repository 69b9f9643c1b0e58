//! Domain events produced by batch mutations.
//!
//! Events are returned to the caller together with the persisted batch, so
//! side effects such as auto-completion are observable without diffing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{HiveId, InspectionId};

/// Something that happened to a batch during one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// The walk began.
    Started {
        at: DateTime<Utc>,
        first: Option<HiveId>,
    },
    /// The current hive was requeued behind every other active hive.
    Skipped { hive: HiveId, next: Option<HiveId> },
    /// A hive was permanently removed from the walk.
    HiveCancelled { hive: HiveId },
    /// Active hives were given a new order.
    Reordered { order: Vec<HiveId> },
    /// The current hive was inspected.
    HiveInspected {
        hive: HiveId,
        inspection: InspectionId,
    },
    /// No pending hives remain.
    Completed { at: DateTime<Utc> },
}

impl BatchEvent {
    /// Short name, used as a log field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Skipped { .. } => "skipped",
            Self::HiveCancelled { .. } => "hive_cancelled",
            Self::Reordered { .. } => "reordered",
            Self::HiveInspected { .. } => "hive_inspected",
            Self::Completed { .. } => "completed",
        }
    }

    #[must_use]
    pub const fn is_completion(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl std::fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started { first: Some(hive), .. } => write!(f, "started, first hive {hive}"),
            Self::Started { first: None, .. } => write!(f, "started"),
            Self::Skipped { hive, .. } => write!(f, "skipped {hive}"),
            Self::HiveCancelled { hive } => write!(f, "cancelled {hive}"),
            Self::Reordered { order } => {
                let order: Vec<&str> = order.iter().map(HiveId::as_str).collect();
                write!(f, "reordered to [{}]", order.join(", "))
            }
            Self::HiveInspected { hive, inspection } => {
                write!(f, "inspected {hive} ({inspection})")
            }
            Self::Completed { .. } => write!(f, "batch completed"),
        }
    }
}
