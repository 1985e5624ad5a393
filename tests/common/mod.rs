//! Common test utilities and helpers
//!
//! Starts an in-process daemon on an ephemeral port and provides a small
//! line-protocol client for driving it.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use waitline::app::grace_timer::GraceTimer;
use waitline::app::server::{QueueServer, ServerContext, ServerError};
use waitline::core::shutdown::ShutdownCoordinator;
use waitline::notifications::api::{shared_broadcaster, EventDispatcher, SharedBroadcaster};
use waitline::queue::api::{QueueCoordinator, QueueSettings};

pub const TIMEOUT: Duration = Duration::from_secs(2);

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: ShutdownCoordinator,
    pub broadcaster: SharedBroadcaster,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_grace(Duration::from_secs(300)).await
    }

    /// Full daemon wiring: coordinator, dispatcher, grace timer and server
    pub async fn start_with_grace(grace: Duration) -> Self {
        let (shutdown, _rx) = ShutdownCoordinator::new();
        let (coordinator, events) = QueueCoordinator::create(QueueSettings::default());
        let broadcaster = shared_broadcaster();

        let (grace_tx, grace_rx) = mpsc::unbounded_channel();
        EventDispatcher::new(broadcaster.clone())
            .with_tap(grace_tx)
            .spawn(events, shutdown.subscribe());
        GraceTimer::new(coordinator.clone(), grace).spawn(grace_rx, shutdown.subscribe());

        let context = ServerContext {
            coordinator,
            broadcaster: broadcaster.clone(),
        };
        let server = QueueServer::bind(
            "127.0.0.1:0".parse().expect("valid address"),
            context,
            shutdown.clone(),
        )
        .await
        .expect("bind ephemeral port");
        let addr = server.local_addr().expect("local addr");
        let handle = tokio::spawn(server.run());

        Self {
            addr,
            shutdown,
            broadcaster,
            handle,
        }
    }

    pub async fn connect(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    /// Wait until the broadcaster has exactly `count` connections
    pub async fn wait_for_connections(&self, count: usize) {
        for _ in 0..100 {
            if self.broadcaster.lock().await.connection_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("broadcaster never reached {count} connection(s)");
    }
}

pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: u64,
    /// Events read while waiting for a response
    events: VecDeque<Value>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 1,
            events: VecDeque::new(),
        }
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write request");
    }

    async fn read_frame(&mut self) -> Option<Value> {
        let line = timeout(TIMEOUT, self.lines.next_line())
            .await
            .expect("frame within timeout")
            .expect("read frame")?;
        Some(serde_json::from_str(&line).expect("frame is JSON"))
    }

    /// Send a request and return its response, buffering any events
    pub async fn request(&mut self, mut request: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        request["id"] = json!(id);
        self.send_raw(&request.to_string()).await;

        loop {
            let frame = self.read_frame().await.expect("connection open");
            match frame["kind"].as_str() {
                Some("response") => {
                    assert_eq!(frame["id"], json!(id), "responses arrive in order");
                    return frame;
                }
                Some("event") => self.events.push_back(frame),
                other => panic!("unexpected frame kind {other:?}"),
            }
        }
    }

    /// Next response frame, whatever its id
    pub async fn next_response_raw(&mut self) -> Value {
        loop {
            let frame = self.read_frame().await.expect("connection open");
            match frame["kind"].as_str() {
                Some("response") => return frame,
                _ => self.events.push_back(frame),
            }
        }
    }

    /// Request and assert success, returning the `result` payload
    pub async fn ok(&mut self, request: Value) -> Value {
        let response = self.request(request).await;
        assert_eq!(response["ok"], json!(true), "request failed: {response}");
        response["result"].clone()
    }

    /// Request and assert failure, returning the `error` body
    pub async fn err(&mut self, request: Value) -> Value {
        let response = self.request(request).await;
        assert_eq!(response["ok"], json!(false), "request succeeded: {response}");
        response["error"].clone()
    }

    /// Next pushed event frame
    pub async fn next_event(&mut self) -> Value {
        if let Some(event) = self.events.pop_front() {
            return event;
        }
        loop {
            let frame = self.read_frame().await.expect("connection open");
            if frame["kind"] == "event" {
                return frame;
            }
        }
    }

    /// Assert nothing is pushed for a short while
    pub async fn expect_no_event(&mut self) {
        assert!(self.events.is_empty(), "buffered events: {:?}", self.events);
        let quiet = timeout(Duration::from_millis(100), self.lines.next_line()).await;
        assert!(quiet.is_err(), "unexpected frame: {quiet:?}");
    }

    /// Read until the server closes the connection, returning the frames seen
    pub async fn read_to_close(&mut self) -> Vec<Value> {
        let mut frames: Vec<Value> = self.events.drain(..).collect();
        while let Some(frame) = self.read_frame().await {
            frames.push(frame);
        }
        frames
    }

    pub async fn subscribe(&mut self, room: &str) {
        self.ok(json!({"op": "subscribe", "room": room})).await;
    }
}
