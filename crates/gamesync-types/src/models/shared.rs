//! Versioned shared-state snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{PeerId, PeerState};

/// Immutable snapshot of every occupied slot plus its version.
///
/// Slots are `Arc`-shared between consecutive snapshots: producing a new
/// version clones only the pointers, so untouched slots stay pointer-equal to
/// the previous snapshot's.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SharedState {
    /// Incremented once per applied change; 0 means nothing merged yet.
    pub version: u64,
    /// Occupied slots only; an empty slot is absent.
    #[serde(default)]
    pub slots: BTreeMap<PeerId, Arc<PeerState>>,
}

impl SharedState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: PeerId) -> Option<&PeerState> {
        self.slots.get(&identity).map(Arc::as_ref)
    }

    pub fn contains(&self, identity: PeerId) -> bool {
        self.slots.contains_key(&identity)
    }

    /// Identities with a recorded state, ascending.
    pub fn occupied(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Next version with `identity`'s slot replaced by `state`.
    pub fn with_slot(&self, identity: PeerId, state: PeerState) -> Self {
        let mut slots = self.slots.clone();
        slots.insert(identity, Arc::new(state));
        Self { version: self.version + 1, slots }
    }

    /// Next version with `identity`'s slot emptied.
    pub fn without_slot(&self, identity: PeerId) -> Self {
        let mut slots = self.slots.clone();
        slots.remove(&identity);
        Self { version: self.version + 1, slots }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(raw: u16) -> PeerId {
        PeerId::new(raw).unwrap()
    }

    #[test]
    fn test_with_slot_shares_untouched_slots() {
        let base = SharedState::empty()
            .with_slot(id(1), PeerState::default().with_field("x", 1))
            .with_slot(id(2), PeerState::default().with_field("x", 2));

        let next = base.with_slot(id(2), PeerState::default().with_field("x", 3));

        assert_eq!(next.version, base.version + 1);
        assert!(Arc::ptr_eq(&base.slots[&id(1)], &next.slots[&id(1)]));
        assert_eq!(next.get(id(2)).unwrap().field("x"), Some(&serde_json::json!(3)));
        // the previous snapshot is untouched
        assert_eq!(base.get(id(2)).unwrap().field("x"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_without_slot() {
        let base = SharedState::empty().with_slot(id(4), PeerState::default());
        let next = base.without_slot(id(4));

        assert_eq!(next.version, 2);
        assert!(next.is_empty());
        assert!(base.contains(id(4)));
    }

    #[test]
    fn test_wire_shape() {
        let state = SharedState::empty().with_slot(id(1), PeerState::default().with_field("hp", 90));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, serde_json::json!({"version": 1, "slots": {"1": {"fields": {"hp": 90}}}}));

        let back: SharedState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_zero_identity_rejected_on_wire() {
        let result: Result<SharedState, _> =
            serde_json::from_value(serde_json::json!({"version": 1, "slots": {"0": {}}}));
        assert!(result.is_err());
    }
}
