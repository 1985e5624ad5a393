//! Event types for the notification system

use crate::queue::types::{PartySize, UserId, VenueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a room: the set of connections interested in one venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

/// Lobby room used when no venue is selected
pub const GENERAL_ROOM: &str = "General";

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn general() -> Self {
        Self::new(GENERAL_ROOM)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&VenueId> for RoomId {
    fn from(venue_id: &VenueId) -> Self {
        Self::new(venue_id.as_str())
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What happened to the line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum QueueEventKind {
    CustomerJoined {
        user_id: UserId,
        party_size: PartySize,
        join_sequence: u64,
    },
    CustomerLeft {
        user_id: UserId,
    },
    CustomerReached {
        user_id: UserId,
        party_size: PartySize,
    },
    CustomerRemoved {
        user_id: UserId,
    },
    CustomerArrived {
        user_id: UserId,
    },
    CustomerCheckedOut {
        user_id: UserId,
    },
    ReachExpired {
        user_id: UserId,
    },
}

impl QueueEventKind {
    pub fn user_id(&self) -> &UserId {
        match self {
            QueueEventKind::CustomerJoined { user_id, .. }
            | QueueEventKind::CustomerLeft { user_id }
            | QueueEventKind::CustomerReached { user_id, .. }
            | QueueEventKind::CustomerRemoved { user_id }
            | QueueEventKind::CustomerArrived { user_id }
            | QueueEventKind::CustomerCheckedOut { user_id }
            | QueueEventKind::ReachExpired { user_id } => user_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueueEventKind::CustomerJoined { .. } => "CustomerJoined",
            QueueEventKind::CustomerLeft { .. } => "CustomerLeft",
            QueueEventKind::CustomerReached { .. } => "CustomerReached",
            QueueEventKind::CustomerRemoved { .. } => "CustomerRemoved",
            QueueEventKind::CustomerArrived { .. } => "CustomerArrived",
            QueueEventKind::CustomerCheckedOut { .. } => "CustomerCheckedOut",
            QueueEventKind::ReachExpired { .. } => "ReachExpired",
        }
    }
}

/// A committed change to one venue's line
///
/// `event_sequence` is assigned under the venue lock, so a gap tells a
/// client it missed something and should re-read the snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEvent {
    pub venue_id: VenueId,
    pub event_sequence: u64,
    /// Unix milliseconds at commit
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: QueueEventKind,
}

impl QueueEvent {
    pub fn new(venue_id: VenueId, event_sequence: u64, kind: QueueEventKind) -> Self {
        Self {
            venue_id,
            event_sequence,
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind,
        }
    }

    pub fn room(&self) -> RoomId {
        RoomId::from(&self.venue_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemEventType {
    /// The server is going away; clients should reconnect and reconcile
    Shutdown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEvent {
    pub event_type: SystemEventType,
    pub timestamp: i64,
    pub message: Option<String>,
}

impl SystemEvent {
    pub fn new(event_type: SystemEventType) -> Self {
        Self {
            event_type,
            timestamp: chrono::Utc::now().timestamp_millis(),
            message: None,
        }
    }

    pub fn with_message(event_type: SystemEventType, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::new(event_type)
        }
    }
}

/// Everything a connection can be sent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "event", rename_all = "camelCase")]
pub enum Event {
    Queue(QueueEvent),
    System(SystemEvent),
}

impl Event {
    pub fn category(&self) -> &'static str {
        match self {
            Event::Queue(_) => "Queue",
            Event::System(_) => "System",
        }
    }
}
