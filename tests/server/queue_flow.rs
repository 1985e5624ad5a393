//! Queue operations over the wire

use crate::common::TestServer;
use serde_json::json;

#[tokio::test]
async fn test_full_visit() {
    let server = TestServer::start().await;
    let mut provider = server.connect().await;
    let mut customer = server.connect().await;

    provider
        .ok(json!({"op": "bindProvider", "providerId": "owner", "venueId": "V1", "venueName": "Noodle Bar"}))
        .await;

    let joined = customer
        .ok(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": 2}))
        .await;
    assert_eq!(joined["joinSequence"], 0);

    let status = customer.ok(json!({"op": "status", "userId": "alice"})).await;
    assert_eq!(status["status"], "QUEUING");
    assert_eq!(status["venueName"], "Noodle Bar");

    let entry = provider
        .ok(json!({"op": "advance", "providerId": "owner", "venueId": "V1"}))
        .await;
    assert_eq!(entry["userId"], "alice");
    assert_eq!(entry["partySize"], 2);

    let arrived = customer
        .ok(json!({"op": "arrive", "venueId": "V1", "userId": "alice"}))
        .await;
    assert_eq!(arrived["status"], "IN_STORE");

    let done = customer
        .ok(json!({"op": "checkout", "venueId": "V1", "userId": "alice"}))
        .await;
    assert_eq!(done["status"], "NOT_IN_QUEUE");
}

#[tokio::test]
async fn test_fifo_and_snapshot() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    client
        .ok(json!({"op": "bindProvider", "providerId": "owner", "venueId": "V1", "venueName": "Stall"}))
        .await;

    for (user, party) in [("a", 1), ("b", 3), ("c", 2)] {
        client
            .ok(json!({"op": "join", "venueId": "V1", "userId": user, "partySize": party}))
            .await;
    }

    let snapshot = client.ok(json!({"op": "snapshot", "venueId": "V1"})).await;
    let users: Vec<_> = snapshot["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["userId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(users, vec!["a", "b", "c"]);
    assert_eq!(snapshot["totalParty"], 6);

    let position = client.ok(json!({"op": "position", "userId": "c"})).await;
    assert_eq!(position["position"], 2);
    assert_eq!(position["partiesAhead"], 2);
    assert_eq!(position["estimatedWaitMinutes"], 10);

    let first = client
        .ok(json!({"op": "advance", "providerId": "owner", "venueId": "V1"}))
        .await;
    assert_eq!(first["userId"], "a");
}

#[tokio::test]
async fn test_error_codes() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let error = client
        .err(json!({"op": "arrive", "venueId": "V1", "userId": "alice"}))
        .await;
    assert_eq!(error["code"], "invalid_transition");
    assert_eq!(error["retryable"], false);

    let error = client
        .err(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": 0}))
        .await;
    assert_eq!(error["code"], "invalid_party");

    for party in [-1i64, 1 << 40] {
        let error = client
            .err(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": party}))
            .await;
        assert_eq!(error["code"], "invalid_party", "partySize {party}");
    }

    client
        .ok(json!({"op": "join", "venueId": "V1", "userId": "alice", "partySize": 1}))
        .await;
    let error = client
        .err(json!({"op": "join", "venueId": "V2", "userId": "alice", "partySize": 1}))
        .await;
    assert_eq!(error["code"], "already_queued");

    let error = client
        .err(json!({"op": "advance", "providerId": "mallory", "venueId": "V1"}))
        .await;
    assert_eq!(error["code"], "unauthorized");

    let error = client.err(json!({"op": "snapshot", "venueId": "nowhere"})).await;
    assert_eq!(error["code"], "not_found");
}

#[tokio::test]
async fn test_leave_twice_is_idempotent() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client
        .ok(json!({"op": "join", "venueId": "V1", "userId": "bob", "partySize": 4}))
        .await;
    let first = client
        .ok(json!({"op": "leave", "venueId": "V1", "userId": "bob"}))
        .await;
    assert_eq!(first["removal"], "removed");
    let second = client
        .ok(json!({"op": "leave", "venueId": "V1", "userId": "bob"}))
        .await;
    assert_eq!(second["removal"], "absent");
}

#[tokio::test]
async fn test_malformed_lines_keep_connection_open() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw("this is not json").await;
    let response = client.next_response_raw().await;
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "invalid_request");

    let pong = client.ok(json!({"op": "ping"})).await;
    assert!(pong["protocolVersion"].as_u64().unwrap() >= 1);
}
