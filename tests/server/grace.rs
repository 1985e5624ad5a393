//! Grace period expiry driven through the daemon wiring

use crate::common::TestServer;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_unanswered_call_expires_and_is_broadcast() {
    let server = TestServer::start_with_grace(Duration::from_millis(100)).await;
    let mut watcher = server.connect().await;
    let mut actor = server.connect().await;
    watcher.subscribe("V1").await;

    actor
        .ok(json!({"op": "bindProvider", "providerId": "owner", "venueId": "V1", "venueName": "Stall"}))
        .await;
    actor
        .ok(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": 2}))
        .await;
    actor
        .ok(json!({"op": "advance", "providerId": "owner", "venueId": "V1"}))
        .await;

    let types: Vec<String> = {
        let mut seen = Vec::new();
        for _ in 0..3 {
            let frame = watcher.next_event().await;
            seen.push(frame["event"]["type"].as_str().unwrap().to_string());
        }
        seen
    };
    assert_eq!(types, vec!["CustomerJoined", "CustomerReached", "ReachExpired"]);

    let status = actor.ok(json!({"op": "status", "userId": "alice"})).await;
    assert_eq!(status["status"], "NOT_IN_QUEUE");

    // Too late to arrive
    let error = actor
        .err(json!({"op": "arrive", "venueId": "V1", "userId": "alice"}))
        .await;
    assert_eq!(error["code"], "invalid_transition");
}

#[tokio::test]
async fn test_arrival_within_grace_sticks() {
    let server = TestServer::start_with_grace(Duration::from_millis(100)).await;
    let mut actor = server.connect().await;

    actor
        .ok(json!({"op": "bindProvider", "providerId": "owner", "venueId": "V1", "venueName": "Stall"}))
        .await;
    actor
        .ok(json!({"op": "join", "venueId": "V1", "userId": "bob", "partySize": 1}))
        .await;
    actor
        .ok(json!({"op": "advance", "providerId": "owner", "venueId": "V1"}))
        .await;
    actor
        .ok(json!({"op": "arrive", "venueId": "V1", "userId": "bob"}))
        .await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = actor.ok(json!({"op": "status", "userId": "bob"})).await;
    assert_eq!(status["status"], "IN_STORE");
}
