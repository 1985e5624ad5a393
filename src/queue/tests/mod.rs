//! Test modules for the waiting-line core
//!
//! Tests are organized by functional area for better maintainability.


use crate::queue::api::{EventStream, QueueCoordinator, QueueSettings, UserId, VenueId};

/// Coordinator with provider `owner-<venue>` bound to each of `venues`
pub(super) fn coordinator_with(venues: &[&str]) -> (QueueCoordinator, EventStream) {
    let (coordinator, events) = QueueCoordinator::new(QueueSettings::default());
    for venue in venues {
        coordinator
            .bind_provider(
                &UserId::new(format!("owner-{venue}")),
                &VenueId::new(*venue),
                &format!("{venue} stall"),
            )
            .unwrap();
    }
    (coordinator, events)
}

pub(super) fn owner(venue: &str) -> crate::queue::api::ProviderCaller {
    crate::queue::api::ProviderCaller::new(format!("owner-{venue}"), venue)
}

pub(super) fn venue(id: &str) -> VenueId {
    VenueId::new(id)
}

pub(super) fn user(id: &str) -> UserId {
    UserId::new(id)
}

/// Drain every event currently buffered on the stream
pub(super) fn drain(events: &mut EventStream) -> Vec<crate::notifications::api::QueueEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
