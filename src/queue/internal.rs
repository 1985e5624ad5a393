//! Internal QueueLedger implementation with sequence-based ordering
//!
//! One ledger per venue. Provides:
//! - Monotonic join sequence numbers (never reused, never decreasing)
//! - FIFO ordering by join sequence
//! - At most one entry per user
//!
//! The ledger holds no lock of its own; the coordinator serialises access
//! per venue.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::types::{PartySize, QueueEntry, UserId, VenueId};
use std::collections::VecDeque;

/// FIFO line of waiting parties for one venue
#[derive(Debug, Clone)]
pub struct QueueLedger {
    venue_id: VenueId,

    /// Next join sequence to hand out
    next_sequence: u64,

    /// Entries ordered by join sequence ascending
    entries: VecDeque<QueueEntry>,
}

impl QueueLedger {
    pub fn new(venue_id: VenueId) -> Self {
        Self {
            venue_id,
            next_sequence: 0,
            entries: VecDeque::new(),
        }
    }

    pub fn venue_id(&self) -> &VenueId {
        &self.venue_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence the next successful join will receive
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.entries.iter().any(|e| &e.user_id == user_id)
    }

    /// Append a party to the tail and return its join sequence
    pub fn join(&mut self, user_id: UserId, party_size: PartySize) -> QueueResult<u64> {
        if self.contains(&user_id) {
            return Err(QueueError::AlreadyQueued {
                user_id,
                venue_id: self.venue_id.clone(),
            });
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.entries.push_back(QueueEntry {
            user_id,
            party_size,
            join_sequence: sequence,
        });

        Ok(sequence)
    }

    /// Pop the entry with the smallest join sequence
    pub fn advance(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Remove a user's entry wherever it sits; `None` if absent
    pub fn remove(&mut self, user_id: &UserId) -> Option<QueueEntry> {
        let index = self.position_of(user_id)?;
        self.entries.remove(index)
    }

    /// 0-based FIFO position of a user
    pub fn position_of(&self, user_id: &UserId) -> Option<usize> {
        self.entries.iter().position(|e| &e.user_id == user_id)
    }

    /// Consistent copy of the line in FIFO order
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Total number of people waiting
    pub fn total_party(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.party_size)).sum()
    }

    /// Number of people in parties ahead of `position`
    pub fn people_ahead(&self, position: usize) -> u64 {
        self.entries
            .iter()
            .take(position)
            .map(|e| u64::from(e.party_size))
            .sum()
    }
}
