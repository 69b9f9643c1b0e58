//! Slot ordering model.
//!
//! Maintains the traversal order of a batch's hive slots. The backing vector
//! keeps insertion order; traversal order is defined only by `position`.
//!
//! # Invariants
//!
//! 1. Active (non-cancelled) slots hold positions `0..n-1`, each exactly once
//! 2. Cancelled slots hold no position
//! 3. A hive appears at most once
//! 4. Completed slots carry an inspection id, pending slots do not
//!
//! Every mutating method restores all four before returning. Validation runs
//! before any slot is touched, so a failed call leaves the order unchanged.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

use std::collections::HashSet;

use itertools::Itertools;
use serde::Serialize;

use super::{
    identifiers::{HiveId, InspectionId},
    slot::HiveSlot,
    status::SlotStatus,
};
use crate::{Error, Result};

/// Ordered set of hive slots for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct SlotOrder {
    slots: Vec<HiveSlot>,
}

impl SlotOrder {
    /// Build the initial order: every hive pending, positions follow input order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateHive` if a hive id appears twice.
    pub fn from_hives(hives: impl IntoIterator<Item = HiveId>) -> Result<Self> {
        let hives: Vec<HiveId> = hives.into_iter().collect();

        if let Some(duplicate) = hives.iter().duplicates().next() {
            return Err(Error::DuplicateHive(duplicate.clone()));
        }

        let slots = hives
            .into_iter()
            .zip(0_u32..)
            .map(|(hive, position)| HiveSlot::pending(hive, position))
            .collect();

        Ok(Self { slots })
    }

    /// Rebuild an order from persisted slots, re-checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns `CorruptState` describing the first violated invariant.
    pub fn from_slots(slots: Vec<HiveSlot>) -> Result<Self> {
        let order = Self { slots };
        order.check_invariants()?;
        Ok(order)
    }

    /// Verify the ordering invariants.
    ///
    /// # Errors
    ///
    /// Returns `CorruptState` describing the first violated invariant.
    pub fn check_invariants(&self) -> Result<()> {
        if let Some(duplicate) = self.slots.iter().map(|s| &s.hive_id).duplicates().next() {
            return Err(Error::CorruptState(format!(
                "hive '{duplicate}' appears more than once"
            )));
        }

        for slot in &self.slots {
            match (slot.status, slot.position, &slot.inspection_id) {
                (SlotStatus::Cancelled, Some(position), _) => {
                    return Err(Error::CorruptState(format!(
                        "cancelled hive '{}' still holds position {position}",
                        slot.hive_id
                    )));
                }
                (SlotStatus::Pending | SlotStatus::Completed, None, _) => {
                    return Err(Error::CorruptState(format!(
                        "active hive '{}' has no position",
                        slot.hive_id
                    )));
                }
                (SlotStatus::Completed, _, None) => {
                    return Err(Error::CorruptState(format!(
                        "completed hive '{}' has no inspection id",
                        slot.hive_id
                    )));
                }
                (SlotStatus::Pending, _, Some(_)) => {
                    return Err(Error::CorruptState(format!(
                        "pending hive '{}' already carries an inspection id",
                        slot.hive_id
                    )));
                }
                _ => {}
            }
        }

        let positions: Vec<u32> = self.slots.iter().filter_map(|s| s.position).sorted().collect();
        let dense = positions
            .iter()
            .copied()
            .zip(0_u32..)
            .all(|(position, expected)| position == expected);
        if dense {
            Ok(())
        } else {
            Err(Error::CorruptState(format!(
                "active positions are not dense: {positions:?}"
            )))
        }
    }

    /// All slots in insertion order.
    #[must_use]
    pub fn slots(&self) -> &[HiveSlot] {
        &self.slots
    }

    #[must_use]
    pub fn into_slots(self) -> Vec<HiveSlot> {
        self.slots
    }

    /// Find a slot by hive id.
    #[must_use]
    pub fn get(&self, hive: &HiveId) -> Option<&HiveSlot> {
        self.slots.iter().find(|s| &s.hive_id == hive)
    }

    /// Active slots in traversal order.
    #[must_use]
    pub fn traversal(&self) -> Vec<&HiveSlot> {
        self.slots
            .iter()
            .filter(|s| s.is_active())
            .sorted_by_key(|s| s.position)
            .collect()
    }

    /// Hive ids of active slots in traversal order.
    #[must_use]
    pub fn traversal_ids(&self) -> Vec<HiveId> {
        self.traversal()
            .into_iter()
            .map(|s| s.hive_id.clone())
            .collect()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.count(SlotStatus::Pending) + self.count(SlotStatus::Completed)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count(SlotStatus::Pending)
    }

    /// Number of slots in the given status.
    #[must_use]
    pub fn count(&self, status: SlotStatus) -> usize {
        self.slots.iter().filter(|s| s.status == status).count()
    }

    /// Assign positions `0..n-1` to active slots in the given order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReorder` if `order` is not exactly a permutation of
    /// the active hive ids (missing id, extra id or duplicate).
    pub fn reorder(&mut self, order: &[HiveId]) -> Result<()> {
        if let Some(duplicate) = order.iter().duplicates().next() {
            return Err(Error::InvalidReorder(format!(
                "hive '{duplicate}' listed more than once"
            )));
        }

        let active: HashSet<&HiveId> = self
            .slots
            .iter()
            .filter(|s| s.is_active())
            .map(|s| &s.hive_id)
            .collect();

        if let Some(extra) = order.iter().find(|hive| !active.contains(hive)) {
            return Err(Error::InvalidReorder(format!(
                "hive '{extra}' is not an active slot of this batch"
            )));
        }

        let requested: HashSet<&HiveId> = order.iter().collect();
        if let Some(missing) = self.traversal_ids().iter().find(|h| !requested.contains(h)) {
            return Err(Error::InvalidReorder(format!(
                "hive '{missing}' is missing from the new order"
            )));
        }

        let sequence = order
            .iter()
            .map(|hive| self.index_of(hive))
            .collect::<Result<Vec<_>>>()?;
        self.assign_positions(&sequence);
        Ok(())
    }

    /// Cancel a slot and close the gap it leaves.
    ///
    /// Relative order of every other active slot is preserved.
    ///
    /// # Errors
    ///
    /// Returns `SlotNotFound`, `SlotAlreadyCancelled` or `SlotAlreadyCompleted`.
    pub fn remove(&mut self, hive: &HiveId) -> Result<()> {
        let index = self.index_of(hive)?;
        let slot = self.slot_at(index)?;
        match slot.status {
            SlotStatus::Cancelled => return Err(Error::SlotAlreadyCancelled(hive.clone())),
            SlotStatus::Completed => return Err(Error::SlotAlreadyCompleted(hive.clone())),
            SlotStatus::Pending => {}
        }

        let sequence: Vec<usize> = self
            .active_indices()
            .into_iter()
            .filter(|&i| i != index)
            .collect();

        if let Some(slot) = self.slots.get_mut(index) {
            slot.status = SlotStatus::Cancelled;
            slot.position = None;
        }
        self.assign_positions(&sequence);
        Ok(())
    }

    /// Move an active slot behind every other active slot.
    ///
    /// # Errors
    ///
    /// Returns `SlotNotFound` or `SlotAlreadyCancelled`.
    pub fn move_to_end(&mut self, hive: &HiveId) -> Result<()> {
        let index = self.index_of(hive)?;
        if !self.slot_at(index)?.is_active() {
            return Err(Error::SlotAlreadyCancelled(hive.clone()));
        }

        let sequence: Vec<usize> = self
            .active_indices()
            .into_iter()
            .filter(|&i| i != index)
            .chain(std::iter::once(index))
            .collect();
        self.assign_positions(&sequence);
        Ok(())
    }

    /// Mark a pending slot completed with its inspection id.
    ///
    /// # Errors
    ///
    /// Returns `SlotNotFound`, `SlotAlreadyCompleted` or `SlotAlreadyCancelled`.
    pub fn mark_completed(&mut self, hive: &HiveId, inspection: InspectionId) -> Result<()> {
        let index = self.index_of(hive)?;
        match self.slot_at(index)?.status {
            SlotStatus::Completed => Err(Error::SlotAlreadyCompleted(hive.clone())),
            SlotStatus::Cancelled => Err(Error::SlotAlreadyCancelled(hive.clone())),
            SlotStatus::Pending => {
                if let Some(slot) = self.slots.get_mut(index) {
                    slot.status = SlotStatus::Completed;
                    slot.inspection_id = Some(inspection);
                }
                Ok(())
            }
        }
    }

    fn index_of(&self, hive: &HiveId) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| &s.hive_id == hive)
            .ok_or_else(|| Error::SlotNotFound(hive.clone()))
    }

    fn slot_at(&self, index: usize) -> Result<&HiveSlot> {
        self.slots
            .get(index)
            .ok_or_else(|| Error::CorruptState(format!("slot index {index} out of range")))
    }

    fn active_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active())
            .sorted_by_key(|(_, s)| s.position)
            .map(|(i, _)| i)
            .collect()
    }

    fn assign_positions(&mut self, sequence: &[usize]) {
        for (&index, position) in sequence.iter().zip(0_u32..) {
            if let Some(slot) = self.slots.get_mut(index) {
                slot.position = Some(position);
            }
        }
    }
}
