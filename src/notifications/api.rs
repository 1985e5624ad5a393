//! Public API for the notification system
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Event types
pub use crate::notifications::event::{
    Event, QueueEvent, QueueEventKind, RoomId, SystemEvent, SystemEventType, GENERAL_ROOM,
};

// Room fan-out
pub use crate::notifications::dispatcher::{shared_broadcaster, EventDispatcher, SharedBroadcaster};
pub use crate::notifications::error::NotificationError;
pub use crate::notifications::manager::{ConnectionId, EventReceiver, PublishOutcome, RoomBroadcaster};

// Statistics
pub use crate::notifications::statistics::ConnectionStatistics;
