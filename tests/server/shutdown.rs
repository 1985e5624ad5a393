//! Graceful shutdown

use crate::common::{TestServer, TIMEOUT};
use serde_json::json;
use tokio::time::timeout;

#[tokio::test]
async fn test_clients_get_shutdown_notice_then_close() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    client.ok(json!({"op": "ping"})).await;

    server.shutdown.trigger_shutdown();

    let frames = client.read_to_close().await;
    let last = frames.last().expect("shutdown notice");
    assert_eq!(last["kind"], "event");
    assert_eq!(last["category"], "system");
    assert_eq!(last["event"]["eventType"], "shutdown");

    let result = timeout(TIMEOUT, server.handle)
        .await
        .expect("server stops")
        .expect("server task");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_no_connections_after_shutdown() {
    let server = TestServer::start().await;
    let addr = server.addr;
    server.shutdown.trigger_shutdown();
    timeout(TIMEOUT, server.handle)
        .await
        .expect("server stops")
        .expect("server task")
        .expect("clean exit");

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
