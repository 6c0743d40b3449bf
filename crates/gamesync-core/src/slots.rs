//! Slot Table: identity → last reported state, materialized as a snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use gamesync_types::{PeerId, PeerState, SharedState};

use crate::registry::Lease;

/// Current materialization of the shared state.
///
/// Every change swaps in a fresh `Arc<SharedState>`; published snapshots are
/// never touched again. `owners` remembers which registration epoch wrote each
/// slot so a late teardown cannot clear a slot that a newer connection owns.
#[derive(Debug, Default)]
pub struct SlotTable {
    current: Arc<SharedState>,
    owners: BTreeMap<PeerId, u64>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Arc<SharedState> {
        &self.current
    }

    /// Replace `lease`'s slot with `update` and publish the next version.
    pub fn apply(&mut self, lease: &Lease, update: PeerState) -> Arc<SharedState> {
        let identity = lease.identity();
        let next = Arc::new(self.current.with_slot(identity, update.bound_to(identity)));
        self.owners.insert(identity, lease.epoch());
        self.current = Arc::clone(&next);
        next
    }

    /// Empty `lease`'s slot if that registration still owns it.
    ///
    /// Returns `None` when there was nothing to clear; no version is consumed
    /// in that case.
    pub fn vacate(&mut self, lease: &Lease) -> Option<Arc<SharedState>> {
        let identity = lease.identity();
        if self.owners.get(&identity) != Some(&lease.epoch()) {
            return None;
        }
        self.owners.remove(&identity);
        let next = Arc::new(self.current.without_slot(identity));
        self.current = Arc::clone(&next);
        Some(next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_apply_binds_identity_and_bumps_version() {
        let registry = Registry::new(4, 4);
        let (lease, _outbound) = registry.register().unwrap();
        let mut table = SlotTable::new();

        let snapshot = table.apply(&lease, PeerState::default().with_field("x", 1));

        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.get(lease.identity()).unwrap().identity, Some(lease.identity()));
        assert!(Arc::ptr_eq(table.current(), &snapshot));
    }

    #[test]
    fn test_vacate_only_for_owning_epoch() {
        let registry = Registry::new(1, 4);
        let (old, _a) = registry.register().unwrap();
        let mut table = SlotTable::new();
        table.apply(&old, PeerState::default());

        registry.deregister(&old);
        let (new, _b) = registry.register().unwrap();
        table.apply(&new, PeerState::default().with_field("fresh", true));

        assert!(table.vacate(&old).is_none());
        assert_eq!(table.current().version, 2);

        let cleared = table.vacate(&new).unwrap();
        assert_eq!(cleared.version, 3);
        assert!(cleared.is_empty());
    }

    #[test]
    fn test_vacate_empty_slot_consumes_no_version() {
        let registry = Registry::new(2, 4);
        let (lease, _outbound) = registry.register().unwrap();
        let mut table = SlotTable::new();

        assert!(table.vacate(&lease).is_none());
        assert_eq!(table.current().version, 0);
    }
}
