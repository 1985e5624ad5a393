//! Tests for the notification system


use crate::notifications::api::{Event, QueueEvent, QueueEventKind};
use crate::queue::api::{UserId, VenueId};

/// A `CustomerReached` event for `user` at `venue`
pub(super) fn reached(venue: &str, user: &str, sequence: u64) -> Event {
    Event::Queue(QueueEvent::new(
        VenueId::new(venue),
        sequence,
        QueueEventKind::CustomerReached {
            user_id: UserId::new(user),
            party_size: 2,
        },
    ))
}
