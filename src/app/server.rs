//! TCP transport for the daemon
//!
//! Accepts connections and runs one task per connection. Each task reads
//! request lines, answers them in order, and interleaves room events from
//! the broadcaster. A closed connection is removed from every room it had
//! joined.

use crate::app::protocol::{parse_request, Frame, Request, RequestEnvelope, Response};
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version;
use crate::notifications::api::{
    ConnectionId, Event, SharedBroadcaster, SystemEvent, SystemEventType,
};
use crate::queue::api::{PartySize, ProviderCaller, QueueCoordinator, QueueError};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

/// How long connection tasks get to flush after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl crate::core::error_handling::ContextualError for ServerError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Everything a connection task needs
#[derive(Clone)]
pub struct ServerContext {
    pub coordinator: Arc<QueueCoordinator>,
    pub broadcaster: SharedBroadcaster,
}

pub struct QueueServer {
    listener: TcpListener,
    context: ServerContext,
    shutdown: ShutdownCoordinator,
    next_connection: AtomicU64,
}

impl QueueServer {
    pub async fn bind(
        addr: SocketAddr,
        context: ServerContext,
        shutdown: ShutdownCoordinator,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            context,
            shutdown,
            next_connection: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until shutdown, then tell every client and drain
    pub async fn run(self) -> Result<(), ServerError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut connections = JoinSet::new();
        log::info!("Listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    log::info!("Server shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = ConnectionId::new(format!(
                            "conn-{}",
                            self.next_connection.fetch_add(1, Ordering::Relaxed)
                        ));
                        log::debug!("Client connected: {peer} as {id}");
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            id,
                            self.context.clone(),
                        ));
                    }
                    Err(e) => log::error!("Failed to accept connection: {e}"),
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        log::warn!("Connection task failed: {e}");
                    }
                }
            }
        }

        // Closing every delivery channel ends each connection once it has
        // written what was already queued, including the shutdown notice.
        {
            let mut broadcaster = self.context.broadcaster.lock().await;
            broadcaster.broadcast_all(Event::System(SystemEvent::with_message(
                SystemEventType::Shutdown,
                "Server shutting down".to_string(),
            )));
            let closed = broadcaster.disconnect_all();
            log::debug!("Closed {closed} connection(s)");
        }

        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            log::warn!("Connections did not drain within {DRAIN_TIMEOUT:?}; aborting");
            connections.abort_all();
        }

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    connection_id: ConnectionId,
    context: ServerContext,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut events = context
        .broadcaster
        .lock()
        .await
        .connect(connection_id.clone(), peer.to_string());

    loop {
        let frame = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => Frame::Response(match parse_request(&line) {
                    Ok(envelope) => handle_request(&context, &connection_id, envelope).await,
                    Err(response) => *response,
                }),
                Ok(None) => break,
                Err(e) => {
                    log::debug!("Read from {connection_id} failed: {e}");
                    break;
                }
            },
            event = events.recv() => match event {
                Some(event) => Frame::Event(event),
                None => break,
            },
        };

        if let Err(e) = write_frame(&mut writer, &frame).await {
            log::debug!("Write to {connection_id} failed: {e}");
            break;
        }
    }

    // Flush whatever was queued before the channel closed
    while let Ok(event) = events.try_recv() {
        if write_frame(&mut writer, &Frame::Event(event)).await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;

    let rooms = context.broadcaster.lock().await.disconnect(&connection_id);
    log::debug!(
        "Client {peer} ({connection_id}) disconnected, left {} room(s)",
        rooms.len()
    );
}

async fn write_frame(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    frame: &Frame,
) -> std::io::Result<()> {
    let mut line = frame.to_line().map_err(std::io::Error::other)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}

/// Execute one request against the core
pub async fn handle_request(
    context: &ServerContext,
    connection_id: &ConnectionId,
    envelope: RequestEnvelope,
) -> Response {
    let RequestEnvelope { id, request } = envelope;
    let coordinator = &context.coordinator;
    log::trace!("{connection_id}: {}", request.op());

    let result = match request {
        Request::Subscribe { room } => {
            let mut broadcaster = context.broadcaster.lock().await;
            return match broadcaster.subscribe(connection_id, room) {
                Ok(added) => Response::success(id, json!({ "subscribed": added })),
                Err(e) => Response::from_notification_error(id, &e),
            };
        }
        Request::Unsubscribe { room } => {
            let removed = context
                .broadcaster
                .lock()
                .await
                .unsubscribe(connection_id, &room);
            return Response::success(id, json!({ "unsubscribed": removed }));
        }
        Request::Ping => {
            return Response::success(
                id,
                json!({
                    "protocolVersion": version::protocol_version(),
                    "version": version::package_version(),
                    "buildTime": version::build_time(),
                    "gitHash": version::git_hash(),
                }),
            );
        }
        Request::BindProvider {
            provider_id,
            venue_id,
            venue_name,
        } => coordinator
            .bind_provider(&provider_id, &venue_id, &venue_name)
            .map(|()| json!({ "venueId": venue_id })),
        Request::Join {
            venue_id,
            user_id,
            party_size,
        } => match PartySize::try_from(party_size) {
            Ok(party_size) => coordinator
                .join_queue(&venue_id, &user_id, party_size)
                .map(|sequence| json!({ "joinSequence": sequence })),
            Err(_) => Err(QueueError::InvalidParty {
                party_size,
                max: coordinator.settings().max_party_size,
            }),
        },
        Request::Leave { venue_id, user_id } => coordinator
            .leave_queue(&venue_id, &user_id)
            .map(|removal| json!({ "removal": removal })),
        Request::Advance {
            provider_id,
            venue_id,
        } => coordinator
            .advance_and_notify(&ProviderCaller {
                account_id: provider_id,
                venue_id,
            })
            .map(|entry| json!(entry)),
        Request::Remove {
            provider_id,
            venue_id,
            user_id,
        } => coordinator
            .remove_customer(
                &ProviderCaller {
                    account_id: provider_id,
                    venue_id,
                },
                &user_id,
            )
            .map(|removal| json!({ "removal": removal })),
        Request::Arrive { venue_id, user_id } => coordinator
            .arrive(&venue_id, &user_id)
            .map(|state| json!(state)),
        Request::Checkout { venue_id, user_id } => coordinator
            .checkout(&venue_id, &user_id)
            .map(|state| json!(state)),
        Request::Snapshot { venue_id } => coordinator
            .queue_snapshot(&venue_id)
            .map(|snapshot| json!(snapshot)),
        Request::Status { user_id } => coordinator
            .account_status(&user_id)
            .map(|state| json!(state)),
        Request::Position { user_id } => coordinator
            .queue_position(&user_id)
            .map(|position| json!(position)),
    };

    match result {
        Ok(value) => Response::success(id, value),
        Err(e) => {
            log::debug!("{connection_id}: request failed: {e}");
            Response::from_queue_error(id, &e)
        }
    }
}
