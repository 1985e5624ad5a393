//! Virtual Waiting-Line Core
//!
//! Per-venue FIFO ledgers, the per-account queue state machine, and the
//! coordinator that applies every change atomically per venue and hands the
//! resulting events off for fan-out.
//!
//! # Overview
//!
//! - **FIFO Fairness**: join sequences are strictly increasing per venue and
//!   `advance` always pops the smallest remaining one
//! - **Single Queue**: an account is associated with at most one venue
//! - **Per-Venue Serialisation**: one mutex per venue; different venues never
//!   wait on each other
//! - **Idempotent Removal**: leaving or removing an absent user succeeds
//! - **Reconciliation**: snapshot and status queries let a reconnecting
//!   client resynchronise without replaying events
//!
//! # Architecture
//!
//! ```text
//!   customer ops                      provider ops
//!  join / leave / arrive          advance_and_notify / remove
//!         │                                │
//!         ▼                                ▼
//! ┌────────────────────────────────────────────────────────┐
//! │                    QueueCoordinator                    │
//! │   ┌──────────────┐ ┌──────────────┐ ┌──────────────┐   │
//! │   │ lane "v1"    │ │ lane "v2"    │ │ lane "v3"    │   │  one mutex each
//! │   │ QueueLedger  │ │ QueueLedger  │ │ QueueLedger  │   │
//! │   └──────────────┘ └──────────────┘ └──────────────┘   │
//! │   account table: UserId -> AccountQueueState           │
//! └───────────────────────────┬────────────────────────────┘
//!                             │ QueueEvent (handed off under the venue lock)
//!                             ▼
//!                    notifications dispatcher ──► RoomBroadcaster
//! ```

pub mod account;
pub mod api;
pub(crate) mod error;
pub(crate) mod internal;
pub(crate) mod manager;
pub mod types;

pub use account::{AccountQueueState, QueueAction, QueueStatus};
pub use error::{QueueError, QueueResult};
pub use internal::QueueLedger;
pub use manager::{EventStream, QueueCoordinator, QueueSettings};

#[cfg(test)]
mod tests;
