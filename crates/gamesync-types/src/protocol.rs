//! Frames exchanged over a peer's stream.
//!
//! Client→server frames are bare [`PeerState`](crate::PeerState) objects.
//! Server→client frames are [`ServerFrame`] values, internally tagged by `type`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SyncError;
use crate::models::{PeerId, SharedState};

/// A frame sent from the server to one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// First frame after a successful registration.
    Welcome { identity: PeerId, capacity: u16 },
    /// One merged snapshot.
    Snapshot { state: Arc<SharedState> },
    /// Registration refused; the stream closes right after.
    Rejected { error: SyncError },
}

impl ServerFrame {
    pub fn snapshot(state: Arc<SharedState>) -> Self {
        Self::Snapshot { state }
    }

    /// Version carried by a snapshot frame.
    pub fn version(&self) -> Option<u64> {
        match self {
            Self::Snapshot { state } => Some(state.version),
            Self::Welcome { .. } | Self::Rejected { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::PeerState;

    #[test]
    fn test_welcome_wire_shape() {
        let frame = ServerFrame::Welcome { identity: PeerId::FIRST, capacity: 10 };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json, serde_json::json!({"type": "welcome", "identity": 1, "capacity": 10}));
    }

    #[test]
    fn test_rejected_carries_typed_error() {
        let frame = ServerFrame::Rejected { error: SyncError::CapacityExceeded { capacity: 2 } };
        let text = serde_json::to_string(&frame).unwrap();
        let back: ServerFrame = serde_json::from_str(&text).unwrap();
        assert_eq!(back, frame);
        assert_eq!(back.version(), None);
    }

    #[test]
    fn test_peer_state_without_identity_parses() {
        let state: PeerState = serde_json::from_str(r#"{"fields": {"x": 1}}"#).unwrap();
        assert_eq!(state.identity, None);
        assert_eq!(state.field("x"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_snapshot_with_occupied_slots_roundtrip() {
        let first = PeerId::FIRST;
        let second = PeerId::new(2).unwrap();
        let state = SharedState::empty()
            .with_slot(first, PeerState::default().with_field("name", "A").bound_to(first))
            .with_slot(second, PeerState::default().with_field("name", "B").bound_to(second));
        let frame = ServerFrame::snapshot(Arc::new(state));

        let text = serde_json::to_string(&frame).unwrap();
        let back: ServerFrame = serde_json::from_str(&text).unwrap();

        assert_eq!(back, frame);
        assert_eq!(back.version(), Some(2));
        let ServerFrame::Snapshot { state } = back else { panic!("expected snapshot") };
        assert_eq!(state.occupied().collect::<Vec<_>>(), vec![first, second]);
        assert_eq!(state.get(second).unwrap().identity, Some(second));
    }
}
