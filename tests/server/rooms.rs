//! Room fan-out over the wire

use crate::common::TestServer;
use serde_json::json;

#[tokio::test]
async fn test_subscribers_receive_until_unsubscribed() {
    let server = TestServer::start().await;
    let mut c1 = server.connect().await;
    let mut c2 = server.connect().await;
    let mut actor = server.connect().await;

    c1.subscribe("V1").await;
    c2.subscribe("V1").await;

    actor
        .ok(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": 2}))
        .await;

    for client in [&mut c1, &mut c2] {
        let frame = client.next_event().await;
        assert_eq!(frame["category"], "queue");
        assert_eq!(frame["event"]["type"], "CustomerJoined");
        assert_eq!(frame["event"]["userId"], "alice");
        assert_eq!(frame["event"]["joinSequence"], 0);
    }

    let left = c1.ok(json!({"op": "unsubscribe", "room": "V1"})).await;
    assert_eq!(left["unsubscribed"], true);

    actor
        .ok(json!({"op": "leave", "venueId": "V1", "userId": "alice"}))
        .await;

    let frame = c2.next_event().await;
    assert_eq!(frame["event"]["type"], "CustomerLeft");
    c1.expect_no_event().await;
}

#[tokio::test]
async fn test_event_sequence_has_no_gaps() {
    let server = TestServer::start().await;
    let mut watcher = server.connect().await;
    let mut actor = server.connect().await;
    watcher.subscribe("V1").await;

    actor
        .ok(json!({"op": "bindProvider", "providerId": "owner", "venueId": "V1", "venueName": "Stall"}))
        .await;
    for user in ["a", "b", "c"] {
        actor
            .ok(json!({"op": "join", "venueId": "V1", "userId": user, "partySize": 1}))
            .await;
    }
    actor
        .ok(json!({"op": "advance", "providerId": "owner", "venueId": "V1"}))
        .await;
    actor
        .ok(json!({"op": "remove", "providerId": "owner", "venueId": "V1", "userId": "c"}))
        .await;

    let mut sequences = Vec::new();
    let mut types = Vec::new();
    for _ in 0..5 {
        let frame = watcher.next_event().await;
        sequences.push(frame["event"]["eventSequence"].as_u64().unwrap());
        types.push(frame["event"]["type"].as_str().unwrap().to_string());
    }

    assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1), "{sequences:?}");
    assert_eq!(
        types,
        vec![
            "CustomerJoined",
            "CustomerJoined",
            "CustomerJoined",
            "CustomerReached",
            "CustomerRemoved"
        ]
    );

    // Snapshot agrees with the last delivered sequence
    let snapshot = watcher.ok(json!({"op": "snapshot", "venueId": "V1"})).await;
    assert_eq!(snapshot["eventSequence"].as_u64(), sequences.last().copied());
    assert_eq!(snapshot["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_venues_are_not_delivered() {
    let server = TestServer::start().await;
    let mut watcher = server.connect().await;
    let mut actor = server.connect().await;
    watcher.subscribe("V2").await;

    actor
        .ok(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": 1}))
        .await;
    watcher.expect_no_event().await;
}

#[tokio::test]
async fn test_disconnect_removes_subscriptions() {
    let server = TestServer::start().await;
    let mut watcher = server.connect().await;
    watcher.subscribe("V1").await;
    watcher.subscribe("General").await;
    server.wait_for_connections(1).await;

    drop(watcher);
    server.wait_for_connections(0).await;

    let broadcaster = server.broadcaster.lock().await;
    assert_eq!(broadcaster.room_count(), 0);
}
