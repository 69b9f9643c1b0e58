//! Current-item resolver.
//!
//! The "current hive" is never stored. It is recomputed from slot state on
//! every read, which keeps it impossible for a cursor to drift away from the
//! slots it points into.

use super::slot::HiveSlot;

/// The pending slot with the smallest position, if any.
///
/// Pure and idempotent: repeated calls over the same slots return the same
/// slot, so it is safe to poll.
#[must_use]
pub fn resolve_current(slots: &[HiveSlot]) -> Option<&HiveSlot> {
    slots
        .iter()
        .filter(|slot| slot.is_pending())
        .min_by_key(|slot| slot.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{identifiers::InspectionId, ordering::SlotOrder, HiveId};

    fn hive(id: &str) -> HiveId {
        HiveId::parse(id).expect("valid hive id")
    }

    #[test]
    fn test_empty_slots_have_no_current() {
        assert!(resolve_current(&[]).is_none());
    }

    #[test]
    fn test_smallest_pending_position_wins() {
        let mut order =
            SlotOrder::from_hives([hive("H1"), hive("H2"), hive("H3")]).expect("valid order");
        order
            .reorder(&[hive("H2"), hive("H3"), hive("H1")])
            .expect("valid reorder");

        let current = resolve_current(order.slots()).map(|s| s.hive_id.as_str());
        assert_eq!(current, Some("H2"));
    }

    #[test]
    fn test_completed_and_cancelled_slots_are_skipped() {
        let mut order =
            SlotOrder::from_hives([hive("H1"), hive("H2"), hive("H3")]).expect("valid order");
        order
            .mark_completed(&hive("H1"), InspectionId::generate())
            .expect("complete H1");
        order.remove(&hive("H2")).expect("cancel H2");

        let current = resolve_current(order.slots()).map(|s| s.hive_id.as_str());
        assert_eq!(current, Some("H3"));
    }

    #[test]
    fn test_no_pending_means_no_current() {
        let mut order = SlotOrder::from_hives([hive("H1")]).expect("valid order");
        order
            .mark_completed(&hive("H1"), InspectionId::generate())
            .expect("complete H1");
        assert!(resolve_current(order.slots()).is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let order =
            SlotOrder::from_hives([hive("H1"), hive("H2")]).expect("valid order");
        assert_eq!(resolve_current(order.slots()), resolve_current(order.slots()));
    }
}
