//! A single hive's entry within a batch.

use serde::{Deserialize, Serialize};

use super::{
    identifiers::{HiveId, InspectionId},
    status::SlotStatus,
};

/// One hive's place in a batch walk.
///
/// `position` is `None` exactly when the slot is cancelled; active slots
/// (pending or completed) always hold a dense, zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiveSlot {
    pub hive_id: HiveId,
    pub position: Option<u32>,
    pub status: SlotStatus,
    pub inspection_id: Option<InspectionId>,
}

impl HiveSlot {
    /// Create a pending slot at the given position.
    #[must_use]
    pub const fn pending(hive_id: HiveId, position: u32) -> Self {
        Self {
            hive_id,
            position: Some(position),
            status: SlotStatus::Pending,
            inspection_id: None,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, SlotStatus::Pending)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
