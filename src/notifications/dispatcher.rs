//! Event dispatcher
//!
//! Drains the coordinator's committed-event stream and fans each event out
//! to its venue's room. Runs as its own task, so queue mutations only ever
//! pay for an unbounded channel send.

use crate::notifications::event::{Event, QueueEvent};
use crate::notifications::manager::RoomBroadcaster;
use crate::queue::api::EventStream;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Broadcaster shared between the dispatcher and connection tasks
pub type SharedBroadcaster = Arc<Mutex<RoomBroadcaster>>;

pub fn shared_broadcaster() -> SharedBroadcaster {
    Arc::new(Mutex::new(RoomBroadcaster::new()))
}

/// Forwards coordinator events to rooms and to any extra taps
pub struct EventDispatcher {
    broadcaster: SharedBroadcaster,
    taps: Vec<UnboundedSender<QueueEvent>>,
}

impl EventDispatcher {
    pub fn new(broadcaster: SharedBroadcaster) -> Self {
        Self {
            broadcaster,
            taps: Vec::new(),
        }
    }

    /// Also forward every event to `tap` (e.g. the grace timer)
    pub fn with_tap(mut self, tap: UnboundedSender<QueueEvent>) -> Self {
        self.taps.push(tap);
        self
    }

    /// Deliver one event to its room and the taps
    pub async fn dispatch(&mut self, event: QueueEvent) {
        self.taps.retain(|tap| tap.send(event.clone()).is_ok());

        let room = event.room();
        let name = event.kind.name();
        let outcome = self
            .broadcaster
            .lock()
            .await
            .publish(&room, Event::Queue(event));

        log::trace!(
            "{name} delivered to {} connection(s) in room {room}",
            outcome.delivered
        );
    }

    /// Run until the event stream closes or shutdown is signalled
    pub fn spawn(
        mut self,
        mut events: EventStream,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Some(event) => self.dispatch(event).await,
                        None => {
                            log::debug!("Event stream closed; dispatcher stopping");
                            break;
                        }
                    },
                    _ = shutdown_rx.recv() => {
                        log::debug!("Dispatcher received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}
