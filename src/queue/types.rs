//! Type definitions for the waiting-line core
//!
//! Identifiers, ledger entries and the read-only views handed out to
//! reconnecting clients.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a venue (one service provider's physical location)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VenueId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of an account, owned by the external account registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Number of people in a waiting party
pub type PartySize = u32;

/// One waiting party in a venue's ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub user_id: UserId,
    pub party_size: PartySize,
    /// Assigned at insertion; strictly increasing per venue, never reused
    pub join_sequence: u64,
}

/// Point-in-time copy of one venue's ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub venue_id: VenueId,
    pub venue_name: String,
    /// Entries in FIFO order
    pub entries: Vec<QueueEntry>,
    /// Sum of party sizes currently waiting
    pub total_party: u64,
    /// Sequence of the last event emitted for this venue (0 if none)
    pub event_sequence: u64,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.user_id.as_str()).collect()
    }
}

/// Where a waiting customer stands in their venue's line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePosition {
    pub venue_id: VenueId,
    /// 0-based index in FIFO order
    pub position: usize,
    pub parties_ahead: usize,
    pub people_ahead: u64,
    pub estimated_wait_minutes: u64,
}

/// Outcome of an idempotent removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Removal {
    /// State changed and an event was emitted
    Removed,
    /// The user was already not queued at that venue
    Absent,
}

/// A service-provider caller, pre-authenticated by the account registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCaller {
    pub account_id: UserId,
    pub venue_id: VenueId,
}

impl ProviderCaller {
    pub fn new(account_id: impl Into<String>, venue_id: impl Into<String>) -> Self {
        Self {
            account_id: UserId::new(account_id),
            venue_id: VenueId::new(venue_id),
        }
    }
}

/// Maps a service-provider account to the venue it operates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProviderBinding {
    pub provider_id: UserId,
    pub venue_id: VenueId,
    pub venue_name: String,
}
