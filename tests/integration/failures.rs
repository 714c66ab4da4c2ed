use crate::*;

use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use rendezvous_core::PeerId;
use rendezvous_services::{IdSource, Relay, SessionRegistry};

/// Hands every connection the same id.
struct FixedId(u64);

impl IdSource for FixedId {
    fn next_id(&self) -> PeerId {
        PeerId::new(self.0).unwrap()
    }
}

/// Send(A → X) for an unknown X: nothing is delivered, A stays connected.
#[tokio::test]
async fn test_unknown_destination_is_dropped_silently() {
    let relay = TestRelay::start().await.unwrap();
    let mut a = relay.connect().await.unwrap();
    let mut b = relay.connect().await.unwrap();
    a.recv().await.unwrap();

    let unknown = (1..1_000_000u64)
        .find(|n| *n != a.id && *n != b.id)
        .unwrap();
    a.send_json(&json!({"type": "offer", "id": unknown, "data": "void"}))
        .await
        .unwrap();

    a.expect_silence().await.unwrap();
    b.expect_silence().await.unwrap();

    // A's connection still routes.
    a.send_json(&json!({"type": "offer", "id": b.id, "data": "ok"}))
        .await
        .unwrap();
    assert_eq!(b.recv().await.unwrap()["data"], "ok");
}

/// Garbage from one peer is discarded without affecting anyone.
#[tokio::test]
async fn test_malformed_frames_are_discarded() {
    let relay = TestRelay::start().await.unwrap();
    let mut a = relay.connect().await.unwrap();
    let mut b = relay.connect().await.unwrap();
    a.recv().await.unwrap();

    for junk in [
        "not json at all",
        "{\"type\": \"offer\", \"id\": ",
        "[1, 2, 3]",
        "42",
        r#"{"type": "offer", "id": {"peer": 5}}"#,
        r#"{"type": "offer", "id": "someone"}"#,
        r#"{"type": "offer", "id": -7}"#,
    ] {
        a.send_raw(junk).await.unwrap();
    }
    a.ws
        .send(Message::binary(vec![0xff, 0xfe, 0xfd]))
        .await
        .unwrap();

    b.expect_silence().await.unwrap();
    a.expect_silence().await.unwrap();
    relay.wait_for_peers(2).await.unwrap();

    a.send_json(&json!({"type": "answer", "id": b.id, "data": "after junk"}))
        .await
        .unwrap();
    let got = b.recv().await.unwrap();
    assert_eq!(got["data"], "after junk");
    assert_eq!(got["id"], json!(a.id));
}

/// A peer that stops reading does not hold up delivery to others.
#[tokio::test]
async fn test_stalled_peer_does_not_block_broadcast() {
    let relay = TestRelay::start().await.unwrap();
    let stalled = relay.connect().await.unwrap();
    let mut watcher = relay.connect().await.unwrap();
    let mut chatty = relay.connect().await.unwrap();
    watcher.recv().await.unwrap(); // chatty joined

    // Flood the stalled peer well past its queue without it ever reading.
    let blob = "x".repeat(16 * 1024);
    for _ in 0..256 {
        chatty
            .send_json(&json!({"type": "candidate", "id": stalled.id, "data": blob}))
            .await
            .unwrap();
    }

    // Membership traffic still reaches everyone else promptly.
    let late = relay.connect().await.unwrap();
    let joined = watcher.recv().await.unwrap();
    assert_eq!(joined["type"], "user_connected");
    assert_eq!(joined["id"], json!(late.id));
    let joined = chatty.recv().await.unwrap();
    assert_eq!(joined["id"], json!(late.id));

    drop(stalled);
}

/// Self-addressed messages come back re-addressed from the sender.
#[tokio::test]
async fn test_message_to_self_is_delivered() {
    let relay = TestRelay::start().await.unwrap();
    let mut a = relay.connect().await.unwrap();

    a.send_json(&json!({"type": "offer", "id": a.id, "data": "loop"}))
        .await
        .unwrap();
    let got = a.recv().await.unwrap();
    assert_eq!(got["id"], json!(a.id));
    assert_eq!(got["data"], "loop");
}

/// A session displaced by an id collision loses its socket and its id.
#[tokio::test]
async fn test_displaced_peer_is_disconnected() {
    let relay = Relay::new(SessionRegistry::new(), FixedId(42));
    let relay = TestRelay::start_relay(relay, true).await.unwrap();

    let mut first = relay.connect().await.unwrap();
    let mut second = relay.connect().await.unwrap();
    assert_eq!(first.id, 42);
    assert_eq!(second.id, 42);

    // The relay drops the displaced socket.
    assert!(first.recv().await.is_err());
    relay.wait_for_peers(1).await.unwrap();

    // Its teardown neither evicts nor announces the newer session.
    second.expect_silence().await.unwrap();
    second
        .send_json(&json!({"type": "offer", "id": 42, "data": "mine"}))
        .await
        .unwrap();
    assert_eq!(second.recv().await.unwrap()["data"], "mine");
}
