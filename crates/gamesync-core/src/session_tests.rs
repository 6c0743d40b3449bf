use axum::extract::ws::Message;
use futures::channel::mpsc;
use futures::{Sink, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use gamesync_types::error::{CLOSE_GOING_AWAY, CLOSE_TRY_AGAIN_LATER};
use gamesync_types::{PeerId, ServerFrame, SyncConfig, SyncError};

use crate::engine::SyncEngine;
use crate::session::{PeerSession, SessionEnd, SessionState};

type Inbound = mpsc::UnboundedSender<Result<Message, axum::Error>>;
type Written = mpsc::UnboundedReceiver<Message>;
type Running = JoinHandle<(Result<SessionEnd, SyncError>, SessionState)>;

struct Harness {
    inbound: Inbound,
    written: Written,
    shutdown: watch::Sender<bool>,
    task: Running,
}

fn engine(max_peers: u16) -> Arc<SyncEngine> {
    SyncEngine::new(SyncConfig { max_peers, ..Default::default() })
}

/// A sink whose every send stays pending for an hour.
fn stalled_sink() -> impl Sink<Message, Error = std::io::Error> + Unpin {
    Box::pin(futures::sink::unfold((), |(), _message: Message| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, std::io::Error>(())
    }))
}

/// Drive a session over in-memory channels instead of a socket.
fn spawn_session(engine: &Arc<SyncEngine>) -> Harness {
    let (inbound, stream) = mpsc::unbounded();
    let (sink, written) = mpsc::unbounded();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let mut session = PeerSession::new(Arc::clone(engine));
    let task = tokio::spawn(async move {
        let end = session.run(sink, stream, shutdown_rx).await;
        (end, session.state())
    });
    Harness { inbound, written, shutdown, task }
}

async fn next_message(written: &mut Written) -> Message {
    tokio::time::timeout(Duration::from_secs(2), written.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("sink closed")
}

async fn next_frame(written: &mut Written) -> ServerFrame {
    match next_message(written).await {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected text frame, got {:?}", other),
    }
}

fn close_code(message: Message) -> u16 {
    match message {
        Message::Close(Some(frame)) => frame.code,
        other => panic!("expected close frame, got {:?}", other),
    }
}

fn update(hp: i64) -> Result<Message, axum::Error> {
    Ok(Message::Text(format!(r#"{{"fields":{{"hp":{}}}}}"#, hp)))
}

#[tokio::test]
async fn test_welcome_then_snapshot() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);

    let welcome = next_frame(&mut harness.written).await;
    assert_eq!(welcome, ServerFrame::Welcome { identity: PeerId::FIRST, capacity: 4 });

    harness.inbound.unbounded_send(update(90)).unwrap();
    let frame = next_frame(&mut harness.written).await;
    assert_eq!(frame.version(), Some(1));
    let ServerFrame::Snapshot { state } = frame else { panic!("expected snapshot") };
    let slot = state.get(PeerId::FIRST).unwrap();
    assert_eq!(slot.identity, Some(PeerId::FIRST));
    assert_eq!(slot.field("hp"), Some(&serde_json::json!(90)));
}

#[tokio::test]
async fn test_stream_end_deregisters() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);
    next_frame(&mut harness.written).await;
    harness.inbound.unbounded_send(update(1)).unwrap();
    next_frame(&mut harness.written).await;

    drop(harness.inbound);
    let (end, state) = harness.task.await.unwrap();

    assert_eq!(end, Ok(SessionEnd::Completed));
    assert_eq!(state, SessionState::Closed);
    assert!(engine.active_peers().is_empty());
    // departure cleared the slot
    assert_eq!(engine.snapshot().version, 2);
    assert!(engine.snapshot().is_empty());
}

#[tokio::test]
async fn test_rejected_when_full() {
    let engine = engine(1);
    let _occupant = engine.register().unwrap();
    let mut harness = spawn_session(&engine);

    let frame = next_frame(&mut harness.written).await;
    assert_eq!(frame, ServerFrame::Rejected { error: SyncError::CapacityExceeded { capacity: 1 } });
    assert_eq!(close_code(next_message(&mut harness.written).await), CLOSE_TRY_AGAIN_LATER);

    let (end, state) = harness.task.await.unwrap();
    assert_eq!(end, Err(SyncError::CapacityExceeded { capacity: 1 }));
    assert_eq!(state, SessionState::Closed);
    assert_eq!(engine.active_peers(), vec![PeerId::FIRST]);
}

#[tokio::test]
async fn test_shutdown_sends_going_away() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);
    next_frame(&mut harness.written).await;

    harness.shutdown.send_replace(true);

    assert_eq!(close_code(next_message(&mut harness.written).await), CLOSE_GOING_AWAY);
    let (end, _) = harness.task.await.unwrap();
    assert_eq!(end, Ok(SessionEnd::Shutdown));
    assert!(engine.active_peers().is_empty());
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);
    next_frame(&mut harness.written).await;

    harness.inbound.unbounded_send(Ok(Message::Text("not json".into()))).unwrap();
    harness.inbound.unbounded_send(update(7)).unwrap();

    let frame = next_frame(&mut harness.written).await;
    assert_eq!(frame.version(), Some(1));
    assert_eq!(engine.active_peers(), vec![PeerId::FIRST]);
}

#[tokio::test]
async fn test_claimed_identity_is_rebound() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);
    next_frame(&mut harness.written).await;

    let spoofed = r#"{"identity":3,"fields":{"hp":5}}"#;
    harness.inbound.unbounded_send(Ok(Message::Text(spoofed.into()))).unwrap();

    let ServerFrame::Snapshot { state } = next_frame(&mut harness.written).await else {
        panic!("expected snapshot")
    };
    assert!(state.contains(PeerId::FIRST));
    assert!(!state.contains(PeerId::new(3).unwrap()));
}

#[tokio::test]
async fn test_stream_error_closes_session() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);
    next_frame(&mut harness.written).await;

    let reset = axum::Error::new(std::io::Error::other("connection reset"));
    harness.inbound.unbounded_send(Err(reset)).unwrap();

    let (end, _) = harness.task.await.unwrap();
    assert!(matches!(end, Ok(SessionEnd::StreamError(ref message)) if message.contains("reset")));
    assert!(engine.active_peers().is_empty());
}

#[tokio::test]
async fn test_unset_identity_zero_is_accepted() {
    let engine = engine(4);
    let mut harness = spawn_session(&engine);
    next_frame(&mut harness.written).await;

    let unset = r#"{"identity":0,"fields":{"hp":5}}"#;
    harness.inbound.unbounded_send(Ok(Message::Text(unset.into()))).unwrap();

    let frame = next_frame(&mut harness.written).await;
    assert_eq!(frame.version(), Some(1));
    let ServerFrame::Snapshot { state } = frame else { panic!("expected snapshot") };
    assert_eq!(state.get(PeerId::FIRST).unwrap().identity, Some(PeerId::FIRST));
    assert_eq!(engine.snapshot().version, 1);
}

#[tokio::test]
async fn test_send_timeout_fails_only_the_stalled_peer() {
    let engine = SyncEngine::new(SyncConfig { max_peers: 4, send_timeout_ms: 50, ..Default::default() });
    let mut healthy = spawn_session(&engine);
    next_frame(&mut healthy.written).await;

    let (_inbound, stream) = mpsc::unbounded::<Result<Message, axum::Error>>();
    let (_shutdown, shutdown_rx) = watch::channel(false);
    let mut stalled = PeerSession::new(Arc::clone(&engine));
    let end = tokio::time::timeout(
        Duration::from_secs(5),
        stalled.run(stalled_sink(), stream, shutdown_rx),
    )
    .await
    .expect("stalled session should give up");

    assert!(matches!(end, Ok(SessionEnd::SinkFailed(ref message)) if message.contains("timed out")));
    assert_eq!(stalled.state(), SessionState::Closed);
    assert_eq!(stalled.identity(), PeerId::new(2));
    assert_eq!(engine.active_peers(), vec![PeerId::FIRST]);

    healthy.inbound.unbounded_send(update(3)).unwrap();
    let frame = next_frame(&mut healthy.written).await;
    assert_eq!(frame.version(), Some(1));
}
