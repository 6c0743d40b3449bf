use axum::extract::State;
use axum::response::Json;

use gamesync_types::{PeerId, PeerState};

use super::get_status;
use super::sync::{get_peers, get_state};
use crate::test_helpers::test_app_state;

#[tokio::test]
async fn test_get_state_empty() {
    let state = test_app_state(4);
    let Json(snapshot) = get_state(State(state)).await;
    assert_eq!(snapshot.version, 0);
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_get_state_after_update() {
    let state = test_app_state(4);
    let (lease, _outbound) = state.engine().register().unwrap();
    state.engine().submit(&lease, PeerState::default().with_field("hp", 10)).unwrap();

    let Json(snapshot) = get_state(State(state)).await;

    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.get(PeerId::FIRST).unwrap().field("hp"), Some(&serde_json::json!(10)));
}

#[tokio::test]
async fn test_get_peers_ordered() {
    let state = test_app_state(4);
    let _peers: Vec<_> = (0..3).map(|_| state.engine().register().unwrap()).collect();

    let Json(peers) = get_peers(State(state)).await;

    let raw: Vec<u16> = peers.into_iter().map(PeerId::get).collect();
    assert_eq!(raw, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_get_status_counts() {
    let state = test_app_state(6);
    let _first = state.engine().register().unwrap();
    let _second = state.engine().register().unwrap();

    let Json(status) = get_status(State(state.clone())).await;

    assert_eq!(status.active_peers, 2);
    assert_eq!(status.capacity, 6);
    assert_eq!(status.state_version, 0);
    assert_eq!(status.instance_id, state.instance_id());
    assert!(!status.version.is_empty());
}
