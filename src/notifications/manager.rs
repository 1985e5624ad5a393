//! RoomBroadcaster implementation
//!
//! Keeps the mapping from room to subscribed connections and delivers events
//! to exactly that set. Each connection owns one unbounded channel, so a slow
//! reader never blocks a publish and per-room order is preserved per
//! connection.

use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, RoomId};
use crate::notifications::statistics::ConnectionStatistics;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Transport-assigned identifier, stable for the connection's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Receiving end handed to the transport for one connection
pub type EventReceiver = UnboundedReceiver<Event>;

struct ConnectionInfo {
    source: String,
    sender: UnboundedSender<Event>,
    rooms: BTreeSet<RoomId>,
    statistics: ConnectionStatistics,
}

/// Result of a best-effort publish
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Connections the event was handed to
    pub delivered: usize,
    /// Connections found closed and cleaned up
    pub dropped: Vec<ConnectionId>,
}

pub struct RoomBroadcaster {
    connections: HashMap<ConnectionId, ConnectionInfo>,
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl Default for RoomBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    /// Register a connection and get the receiver its events arrive on
    ///
    /// Re-registering an id replaces the previous connection and drops its
    /// subscriptions.
    pub fn connect(&mut self, connection_id: ConnectionId, source: String) -> EventReceiver {
        let (sender, receiver) = unbounded_channel();

        if self.connections.contains_key(&connection_id) {
            log::warn!("Connection '{connection_id}' re-registered (source: {source})");
            self.disconnect(&connection_id);
        }

        self.connections.insert(
            connection_id,
            ConnectionInfo {
                source,
                sender,
                rooms: BTreeSet::new(),
                statistics: ConnectionStatistics::new(),
            },
        );

        receiver
    }

    /// Remove a connection and every subscription it held
    ///
    /// Returns the rooms it was subscribed to. Unknown ids are a no-op.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let Some(info) = self.connections.remove(connection_id) else {
            return Vec::new();
        };

        for room in &info.rooms {
            self.detach(connection_id, room);
        }

        log::debug!(
            "Connection '{connection_id}' ({}) disconnected from {} room(s)",
            info.source,
            info.rooms.len()
        );
        info.rooms.into_iter().collect()
    }

    /// Add a connection to a room
    ///
    /// Idempotent: returns `Ok(false)` if it was already subscribed.
    pub fn subscribe(
        &mut self,
        connection_id: &ConnectionId,
        room: RoomId,
    ) -> Result<bool, NotificationError> {
        let info = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| NotificationError::UnknownConnection(connection_id.to_string()))?;

        if !info.rooms.insert(room.clone()) {
            return Ok(false);
        }

        log::trace!("Connection '{connection_id}' joined room {room}");
        self.rooms
            .entry(room)
            .or_default()
            .insert(connection_id.clone());
        Ok(true)
    }

    /// Remove a connection from a room
    ///
    /// Idempotent: returns `false` if there was nothing to remove, including
    /// for unknown connections.
    pub fn unsubscribe(&mut self, connection_id: &ConnectionId, room: &RoomId) -> bool {
        let removed = self
            .connections
            .get_mut(connection_id)
            .is_some_and(|info| info.rooms.remove(room));

        if removed {
            self.detach(connection_id, room);
            log::trace!("Connection '{connection_id}' left room {room}");
        }
        removed
    }

    /// Deliver an event to every connection currently in `room`
    ///
    /// Best-effort: connections whose channel has closed are disconnected and
    /// reported in the outcome.
    pub fn publish(&mut self, room: &RoomId, event: Event) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();

        let Some(members) = self.rooms.get(room) else {
            return outcome;
        };

        for connection_id in members {
            let Some(info) = self.connections.get(connection_id) else {
                continue;
            };
            if info.sender.send(event.clone()).is_ok() {
                info.statistics.record_delivery();
                outcome.delivered += 1;
            } else {
                outcome.dropped.push(connection_id.clone());
            }
        }

        for connection_id in &outcome.dropped {
            log::warn!(
                "Dropping closed connection '{connection_id}' while publishing {} to {room}",
                event.category()
            );
            self.disconnect(connection_id);
        }

        outcome
    }

    /// Deliver an event to every registered connection regardless of room
    pub fn broadcast_all(&mut self, event: Event) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();

        for (connection_id, info) in &self.connections {
            if info.sender.send(event.clone()).is_ok() {
                info.statistics.record_delivery();
                outcome.delivered += 1;
            } else {
                outcome.dropped.push(connection_id.clone());
            }
        }

        for connection_id in &outcome.dropped {
            log::warn!(
                "Dropping closed connection '{connection_id}' while broadcasting {}",
                event.category()
            );
            self.disconnect(connection_id);
        }

        outcome
    }

    /// Drop every connection; their receivers drain and then close
    pub fn disconnect_all(&mut self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        self.rooms.clear();
        count
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn has_connection(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Connections subscribed to `room`, in id order
    pub fn subscribers(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Rooms `connection_id` is subscribed to, in id order
    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        self.connections
            .get(connection_id)
            .map(|info| info.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_statistics(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<&ConnectionStatistics> {
        self.connections
            .get(connection_id)
            .map(|info| &info.statistics)
    }

    /// Drop one membership from the room index, removing empty rooms
    fn detach(&mut self, connection_id: &ConnectionId, room: &RoomId) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}
