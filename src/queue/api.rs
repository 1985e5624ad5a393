//! Public API for the waiting-line core
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Coordinator
pub use crate::queue::manager::{EventStream, QueueCoordinator, QueueSettings};

// Ledger and state machine
pub use crate::queue::account::{next_status, AccountQueueState, QueueAction, QueueStatus};
pub use crate::queue::internal::QueueLedger;

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

// Type definitions
pub use crate::queue::types::{
    PartySize, ProviderCaller, QueueEntry, QueuePosition, QueueSnapshot, Removal,
    ServiceProviderBinding, UserId, VenueId,
};
