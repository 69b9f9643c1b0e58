//! The `BatchInspection` aggregate.
//!
//! All mutations go through [`BatchInspection::apply`], which validates the
//! command against the batch state machine, updates the slot order and then
//! runs the completion hook once. A command that fails leaves the batch
//! untouched.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    events::BatchEvent,
    identifiers::{BatchId, HiveId, InspectionId},
    ordering::SlotOrder,
    resolver::resolve_current,
    slot::HiveSlot,
    status::{BatchStatus, SlotStatus},
};
use crate::{Error, Result};

/// A mutation requested by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCommand {
    Start,
    SkipCurrent,
    CancelHive(HiveId),
    Reorder(Vec<HiveId>),
    /// Mark the current hive completed with an inspection created upstream.
    CompleteCurrent(InspectionId),
}

impl BatchCommand {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SkipCurrent => "skip_current",
            Self::CancelHive(_) => "cancel_hive",
            Self::Reorder(_) => "reorder",
            Self::CompleteCurrent(_) => "complete_current",
        }
    }
}

/// Slot counts for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Flat persisted form of a batch, before invariants are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub id: BatchId,
    pub status: BatchStatus,
    pub slots: Vec<HiveSlot>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// One inspection session over an ordered set of hives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "BatchRecord")]
pub struct BatchInspection {
    id: BatchId,
    status: BatchStatus,
    slots: SlotOrder,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl BatchInspection {
    /// New draft batch with every hive pending in the given order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateHive` if a hive id is listed twice.
    pub fn draft(
        id: BatchId,
        hives: impl IntoIterator<Item = HiveId>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            status: BatchStatus::Draft,
            slots: SlotOrder::from_hives(hives)?,
            created_at: now,
            started_at: None,
            completed_at: None,
            version: 0,
        })
    }

    /// Rebuild a batch from storage.
    ///
    /// # Errors
    ///
    /// Returns `CorruptState` if the record violates an ordering invariant or
    /// its status disagrees with its slots and timestamps.
    pub fn reconstruct(record: BatchRecord) -> Result<Self> {
        let slots = SlotOrder::from_slots(record.slots)?;
        let pending = slots.pending_count();
        let completed = slots.count(SlotStatus::Completed);

        let consistent = match record.status {
            BatchStatus::Draft => {
                record.started_at.is_none() && record.completed_at.is_none() && completed == 0
            }
            BatchStatus::InProgress => {
                record.started_at.is_some() && record.completed_at.is_none() && pending > 0
            }
            BatchStatus::Completed => {
                record.started_at.is_some() && record.completed_at.is_some() && pending == 0
            }
        };

        if !consistent {
            return Err(Error::CorruptState(format!(
                "batch '{}' is {} with {pending} pending and {completed} completed hives",
                record.id, record.status
            )));
        }

        Ok(Self {
            id: record.id,
            status: record.status,
            slots,
            created_at: record.created_at,
            started_at: record.started_at,
            completed_at: record.completed_at,
            version: record.version,
        })
    }

    /// Flatten into the persisted form.
    #[must_use]
    pub fn to_record(&self) -> BatchRecord {
        BatchRecord {
            id: self.id.clone(),
            status: self.status,
            slots: self.slots.slots().to_vec(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            version: self.version,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &BatchId {
        &self.id
    }

    #[must_use]
    pub const fn status(&self) -> BatchStatus {
        self.status
    }

    /// Slots in insertion order.
    #[must_use]
    pub fn slots(&self) -> &[HiveSlot] {
        self.slots.slots()
    }

    #[must_use]
    pub const fn order(&self) -> &SlotOrder {
        &self.slots
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Persisted revision. Bumped by the repository on every successful save.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Set by repositories after a successful compare-and-swap.
    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// The pending hive with the lowest position.
    ///
    /// On a draft batch this is the hive the walk will start with.
    #[must_use]
    pub fn current(&self) -> Option<&HiveSlot> {
        resolve_current(self.slots.slots())
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            total: self.slots.slots().len(),
            pending: self.slots.pending_count(),
            completed: self.slots.count(SlotStatus::Completed),
            cancelled: self.slots.count(SlotStatus::Cancelled),
        }
    }

    /// Validate and apply a command, then run the completion hook.
    ///
    /// # Errors
    ///
    /// Any domain error raised by the command. On error the batch is unchanged.
    pub fn apply(&mut self, command: BatchCommand, now: DateTime<Utc>) -> Result<Vec<BatchEvent>> {
        let mut events = match command {
            BatchCommand::Start => self.start(now)?,
            BatchCommand::SkipCurrent => self.skip_current()?,
            BatchCommand::CancelHive(hive) => self.cancel_hive(hive)?,
            BatchCommand::Reorder(order) => self.reorder(order)?,
            BatchCommand::CompleteCurrent(inspection) => self.complete_current(inspection)?,
        };

        if let Some(completed) = self.complete_if_exhausted(now)? {
            events.push(completed);
        }
        Ok(events)
    }

    /// The hive an inspection would be recorded against right now.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotInProgress` or `NoCurrentSlot`.
    pub fn inspection_target(&self) -> Result<&HiveId> {
        self.require_in_progress()?;
        self.current()
            .map(|slot| &slot.hive_id)
            .ok_or(Error::NoCurrentSlot)
    }

    fn start(&mut self, now: DateTime<Utc>) -> Result<Vec<BatchEvent>> {
        if self.status != BatchStatus::Draft {
            return Err(Error::BatchAlreadyStarted(self.status));
        }
        if self.slots.active_count() == 0 {
            return Err(Error::EmptyBatch);
        }

        self.transition(BatchStatus::InProgress)?;
        self.started_at = Some(now);

        Ok(vec![BatchEvent::Started {
            at: now,
            first: self.current().map(|slot| slot.hive_id.clone()),
        }])
    }

    fn skip_current(&mut self) -> Result<Vec<BatchEvent>> {
        let hive = self.inspection_target()?.clone();
        self.slots.move_to_end(&hive)?;

        Ok(vec![BatchEvent::Skipped {
            next: self.current().map(|slot| slot.hive_id.clone()),
            hive,
        }])
    }

    fn cancel_hive(&mut self, hive: HiveId) -> Result<Vec<BatchEvent>> {
        self.require_editable()?;
        self.slots.remove(&hive)?;
        Ok(vec![BatchEvent::HiveCancelled { hive }])
    }

    fn reorder(&mut self, order: Vec<HiveId>) -> Result<Vec<BatchEvent>> {
        self.require_editable()?;
        self.slots.reorder(&order)?;
        Ok(vec![BatchEvent::Reordered { order }])
    }

    fn complete_current(&mut self, inspection: InspectionId) -> Result<Vec<BatchEvent>> {
        let hive = self.inspection_target()?.clone();
        self.slots.mark_completed(&hive, inspection.clone())?;
        Ok(vec![BatchEvent::HiveInspected { hive, inspection }])
    }

    /// Completion hook shared by every command.
    fn complete_if_exhausted(&mut self, now: DateTime<Utc>) -> Result<Option<BatchEvent>> {
        if self.status != BatchStatus::InProgress || self.current().is_some() {
            return Ok(None);
        }

        self.transition(BatchStatus::Completed)?;
        self.completed_at = Some(now);
        Ok(Some(BatchEvent::Completed { at: now }))
    }

    fn require_in_progress(&self) -> Result<()> {
        if self.status == BatchStatus::InProgress {
            Ok(())
        } else {
            Err(Error::BatchNotInProgress(self.status))
        }
    }

    fn require_editable(&self) -> Result<()> {
        if self.status.accepts_ordering_changes() {
            Ok(())
        } else {
            Err(Error::BatchCompleted)
        }
    }

    fn transition(&mut self, target: BatchStatus) -> Result<()> {
        self.status.validate_transition(target)?;
        self.status = target;
        Ok(())
    }
}

impl TryFrom<BatchRecord> for BatchInspection {
    type Error = Error;

    fn try_from(record: BatchRecord) -> Result<Self> {
        Self::reconstruct(record)
    }
}
