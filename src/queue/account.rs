//! Per-account queue state machine
//!
//! Tracks a user's relationship to at most one venue's line. The transition
//! table is the single source of truth for which actions are accepted; any
//! pair missing from it is rejected with `InvalidTransition`.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::types::VenueId;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A user's relationship to the line
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    #[default]
    NotInQueue,
    Queuing,
    QueueReached,
    InStore,
}

/// Actions that drive the state machine
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueAction {
    /// Customer enters a venue's line
    Join,
    /// Provider calls the head of the line
    Advance,
    /// Customer abandons the line or leaves the store
    Leave,
    /// Customer checks in at the venue after being called
    Arrive,
    /// Grace window elapsed without arrival
    Timeout,
    /// Customer finishes their visit
    Checkout,
    /// Provider drops the customer
    Remove,
}

/// Next status for `action` taken from `status`, or `None` if not allowed
pub fn next_status(status: QueueStatus, action: QueueAction) -> Option<QueueStatus> {
    use QueueAction as A;
    use QueueStatus as S;

    match (status, action) {
        (S::NotInQueue, A::Join) => Some(S::Queuing),
        (S::Queuing, A::Advance) => Some(S::QueueReached),
        (S::Queuing, A::Leave) => Some(S::NotInQueue),
        (S::InStore, A::Leave) => Some(S::NotInQueue),
        (S::QueueReached, A::Arrive) => Some(S::InStore),
        (S::QueueReached, A::Timeout) => Some(S::NotInQueue),
        (S::InStore, A::Checkout) => Some(S::NotInQueue),
        (S::Queuing | S::QueueReached | S::InStore, A::Remove) => Some(S::NotInQueue),
        _ => None,
    }
}

/// Authoritative queue state of one account
///
/// Invariant: `status == NotInQueue` exactly when `venue_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQueueState {
    pub status: QueueStatus,
    pub venue_id: Option<VenueId>,
    /// Display only, mirrors `venue_id`
    pub venue_name: Option<String>,
}

impl AccountQueueState {
    pub fn not_in_queue() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status != QueueStatus::NotInQueue
    }

    /// Whether this account is associated with `venue_id`
    pub fn is_at(&self, venue_id: &VenueId) -> bool {
        self.venue_id.as_ref() == Some(venue_id)
    }

    /// Compute the state after applying `action` at `venue_id`
    ///
    /// Pure: the receiver is left untouched so callers can commit the
    /// result only once every other check has passed.
    pub fn apply(
        &self,
        action: QueueAction,
        venue_id: &VenueId,
        venue_name: &str,
    ) -> QueueResult<Self> {
        let rejected = QueueError::InvalidTransition {
            status: self.status,
            action,
        };

        // Everything except Join must target the venue the account is at
        if action != QueueAction::Join && !self.is_at(venue_id) {
            return Err(rejected);
        }

        let status = next_status(self.status, action).ok_or(rejected)?;

        Ok(match status {
            QueueStatus::NotInQueue => Self::not_in_queue(),
            _ if action == QueueAction::Join => Self {
                status,
                venue_id: Some(venue_id.clone()),
                venue_name: Some(venue_name.to_string()),
            },
            _ => Self {
                status,
                venue_id: self.venue_id.clone(),
                venue_name: self.venue_name.clone(),
            },
        })
    }
}
