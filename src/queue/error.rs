//! Queue Error Types

use crate::queue::account::{QueueAction, QueueStatus};
use crate::queue::types::{PartySize, UserId, VenueId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("User {user_id} is already queued at venue {venue_id}")]
    AlreadyQueued { user_id: UserId, venue_id: VenueId },

    #[error("Invalid party size {party_size} (must be between 1 and {max})")]
    InvalidParty { party_size: i64, max: PartySize },

    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        status: QueueStatus,
        action: QueueAction,
    },

    #[error("Queue for venue {venue_id} is empty")]
    EmptyQueue { venue_id: VenueId },

    #[error("Account {account_id} is not bound to venue {venue_id}")]
    Unauthorized {
        account_id: UserId,
        venue_id: VenueId,
    },

    #[error("Provider {provider_id} is already bound to venue {venue_id}")]
    AlreadyBound {
        provider_id: UserId,
        venue_id: VenueId,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl QueueError {
    /// Stable machine-readable code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::AlreadyQueued { .. } => "already_queued",
            QueueError::InvalidParty { .. } => "invalid_party",
            QueueError::InvalidTransition { .. } => "invalid_transition",
            QueueError::EmptyQueue { .. } => "empty_queue",
            QueueError::Unauthorized { .. } => "unauthorized",
            QueueError::AlreadyBound { .. } => "already_bound",
            QueueError::NotFound { .. } => "not_found",
            QueueError::Internal { .. } => "internal",
        }
    }

    /// Whether resending the same request could succeed
    ///
    /// Only internal faults are retryable. A rejected transition means the
    /// client's view is stale and it should resynchronise instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Internal { .. })
    }

    pub(crate) fn internal(message: String) -> Self {
        QueueError::Internal { message }
    }
}

impl crate::core::error_handling::ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        !matches!(
            self,
            QueueError::Unauthorized { .. } | QueueError::Internal { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::AlreadyQueued { .. } => Some("You are already waiting in a queue"),
            QueueError::InvalidParty { .. } => Some("Party size is out of range"),
            QueueError::InvalidTransition { .. } => {
                Some("Your queue status has changed, please refresh")
            }
            QueueError::EmptyQueue { .. } => Some("Nobody is waiting in the queue"),
            QueueError::AlreadyBound { .. } => Some("This account already operates a venue"),
            QueueError::NotFound { .. } => Some("Not found"),
            QueueError::Unauthorized { .. } | QueueError::Internal { .. } => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
