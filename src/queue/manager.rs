//! QueueCoordinator - Central coordination for all venue lines
//!
//! The QueueCoordinator owns every venue's ledger, the account state table and
//! the provider bindings. Every mutation is applied under the target venue's
//! lock and its event is handed off before that lock is released, so the
//! event stream for a venue is in commit order.
//!
//! Lock order is always venue lane first, then the account table. The account
//! table is only held for the check-and-set of a single account.

use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::notifications::event::{QueueEvent, QueueEventKind};
use crate::queue::account::{AccountQueueState, QueueAction, QueueStatus};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::QueueLedger;
use crate::queue::types::{
    PartySize, ProviderCaller, QueueEntry, QueuePosition, QueueSnapshot, Removal,
    ServiceProviderBinding, UserId, VenueId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Tunables for the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Largest party accepted by `join_queue`
    pub max_party_size: PartySize,
    /// Minutes per party ahead used for wait estimates
    pub minutes_per_party: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_party_size: 20,
            minutes_per_party: 5,
        }
    }
}

/// One venue's line plus its event counter, guarded by a single mutex
#[derive(Debug)]
struct VenueLane {
    ledger: QueueLedger,
    venue_name: String,
    event_sequence: u64,
}

impl VenueLane {
    fn new(venue_id: VenueId, venue_name: String) -> Self {
        Self {
            ledger: QueueLedger::new(venue_id),
            venue_name,
            event_sequence: 0,
        }
    }
}

/// Receiving end of the coordinator's committed-event stream
pub type EventStream = UnboundedReceiver<QueueEvent>;

/// Owner of all ledgers and account states
///
/// # Thread Safety
///
/// Share it as `Arc<QueueCoordinator>`. Operations on different venues run
/// in parallel; operations on one venue are applied one at a time.
///
/// # Example
///
/// ```rust,no_run
/// use waitline::queue::api::{ProviderCaller, QueueCoordinator, QueueSettings, UserId, VenueId};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (coordinator, _events) = QueueCoordinator::new(QueueSettings::default());
/// let venue = VenueId::new("v1");
/// coordinator.bind_provider(&UserId::new("owner"), &venue, "Kopi Stall")?;
///
/// coordinator.join_queue(&venue, &UserId::new("alice"), 2)?;
/// let called = coordinator.advance_and_notify(&ProviderCaller::new("owner", "v1"))?;
/// assert_eq!(called.user_id.as_str(), "alice");
/// # Ok(())
/// # }
/// ```
pub struct QueueCoordinator {
    settings: QueueSettings,
    venues: RwLock<HashMap<VenueId, Arc<Mutex<VenueLane>>>>,
    accounts: Mutex<HashMap<UserId, AccountQueueState>>,
    bindings: RwLock<HashMap<UserId, ServiceProviderBinding>>,
    events: UnboundedSender<QueueEvent>,
}

impl QueueCoordinator {
    /// Create a coordinator and the stream its events are handed off to
    pub fn new(settings: QueueSettings) -> (Self, EventStream) {
        let (events, receiver) = unbounded_channel();
        let coordinator = Self {
            settings,
            venues: RwLock::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
            events,
        };
        (coordinator, receiver)
    }

    /// Create a shareable coordinator
    pub fn create(settings: QueueSettings) -> (Arc<Self>, EventStream) {
        let (coordinator, receiver) = Self::new(settings);
        (Arc::new(coordinator), receiver)
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    // ---- provider bindings ------------------------------------------------

    /// Bind a service-provider account to the venue it operates
    ///
    /// Rebinding to the same venue refreshes the display name; binding to a
    /// different venue is refused.
    pub fn bind_provider(
        &self,
        provider_id: &UserId,
        venue_id: &VenueId,
        venue_name: &str,
    ) -> QueueResult<()> {
        {
            let mut bindings =
                handle_rwlock_write(self.bindings.write(), QueueError::internal)?;
            if let Some(existing) = bindings.get(provider_id) {
                if &existing.venue_id != venue_id {
                    return Err(QueueError::AlreadyBound {
                        provider_id: provider_id.clone(),
                        venue_id: existing.venue_id.clone(),
                    });
                }
            }
            bindings.insert(
                provider_id.clone(),
                ServiceProviderBinding {
                    provider_id: provider_id.clone(),
                    venue_id: venue_id.clone(),
                    venue_name: venue_name.to_string(),
                },
            );
        }

        let lane = self.lane_or_create(venue_id)?;
        let mut lane = lock_lane(&lane)?;
        lane.venue_name = venue_name.to_string();

        log::info!("Provider {provider_id} bound to venue {venue_id} ({venue_name})");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn provider_binding(&self, provider_id: &UserId) -> QueueResult<Option<ServiceProviderBinding>> {
        let bindings = handle_rwlock_read(self.bindings.read(), QueueError::internal)?;
        Ok(bindings.get(provider_id).cloned())
    }

    fn authorize(&self, caller: &ProviderCaller) -> QueueResult<()> {
        let bindings = handle_rwlock_read(self.bindings.read(), QueueError::internal)?;
        match bindings.get(&caller.account_id) {
            Some(binding) if binding.venue_id == caller.venue_id => Ok(()),
            other => {
                log::error!(
                    "Integrity fault: account {} acted on venue {} but is bound to {:?}",
                    caller.account_id,
                    caller.venue_id,
                    other.map(|b| b.venue_id.as_str())
                );
                Err(QueueError::Unauthorized {
                    account_id: caller.account_id.clone(),
                    venue_id: caller.venue_id.clone(),
                })
            }
        }
    }

    // ---- customer operations ----------------------------------------------

    /// Append a party to a venue's line, returning its join sequence
    pub fn join_queue(
        &self,
        venue_id: &VenueId,
        user_id: &UserId,
        party_size: PartySize,
    ) -> QueueResult<u64> {
        if party_size == 0 || party_size > self.settings.max_party_size {
            return Err(QueueError::InvalidParty {
                party_size: i64::from(party_size),
                max: self.settings.max_party_size,
            });
        }

        let lane = self.lane_or_create(venue_id)?;
        let mut lane = lock_lane(&lane)?;

        let sequence = {
            let mut accounts = self.lock_accounts()?;
            let current = accounts.get(user_id).cloned().unwrap_or_default();
            if let Some(queued_at) = current.venue_id.as_ref().filter(|_| current.is_active()) {
                return Err(QueueError::AlreadyQueued {
                    user_id: user_id.clone(),
                    venue_id: queued_at.clone(),
                });
            }

            let next = current.apply(QueueAction::Join, venue_id, &lane.venue_name)?;
            let sequence = lane.ledger.join(user_id.clone(), party_size)?;
            accounts.insert(user_id.clone(), next);
            sequence
        };

        self.emit(
            &mut lane,
            QueueEventKind::CustomerJoined {
                user_id: user_id.clone(),
                party_size,
                join_sequence: sequence,
            },
        );
        log::debug!("{user_id} joined {venue_id} (party {party_size}, sequence {sequence})");
        Ok(sequence)
    }

    /// Leave a venue's line, or leave the store after being served
    ///
    /// Idempotent: a user who is not queued there gets `Removal::Absent`.
    /// A user already called (`QUEUE_REACHED`) lost the race to the advance
    /// and also gets `Absent` with their status untouched.
    pub fn leave_queue(&self, venue_id: &VenueId, user_id: &UserId) -> QueueResult<Removal> {
        let Some(lane) = self.lane(venue_id)? else {
            return Ok(Removal::Absent);
        };
        let mut lane = lock_lane(&lane)?;

        {
            let mut accounts = self.lock_accounts()?;
            let current = accounts.get(user_id).cloned().unwrap_or_default();
            if !current.is_at(venue_id) || current.status == QueueStatus::QueueReached {
                log::trace!("{user_id} leave {venue_id} is a no-op ({})", current.status);
                return Ok(Removal::Absent);
            }

            let next = current.apply(QueueAction::Leave, venue_id, &lane.venue_name)?;
            lane.ledger.remove(user_id);
            store_account(&mut accounts, user_id, next);
        }

        self.emit(
            &mut lane,
            QueueEventKind::CustomerLeft {
                user_id: user_id.clone(),
            },
        );
        log::debug!("{user_id} left {venue_id}");
        Ok(Removal::Removed)
    }

    /// Customer checks in after being called
    pub fn arrive(&self, venue_id: &VenueId, user_id: &UserId) -> QueueResult<AccountQueueState> {
        self.transition(venue_id, user_id, QueueAction::Arrive, |user_id| {
            QueueEventKind::CustomerArrived { user_id }
        })
    }

    /// Customer finishes their visit
    pub fn checkout(&self, venue_id: &VenueId, user_id: &UserId) -> QueueResult<AccountQueueState> {
        self.transition(venue_id, user_id, QueueAction::Checkout, |user_id| {
            QueueEventKind::CustomerCheckedOut { user_id }
        })
    }

    /// Grace window elapsed without arrival; driven by an external timer
    pub fn expire_reached(
        &self,
        venue_id: &VenueId,
        user_id: &UserId,
    ) -> QueueResult<AccountQueueState> {
        self.transition(venue_id, user_id, QueueAction::Timeout, |user_id| {
            QueueEventKind::ReachExpired { user_id }
        })
    }

    // ---- provider operations ----------------------------------------------

    /// Pop the head of the caller's line and notify that customer
    ///
    /// The account transition and the event hand-off happen under the venue
    /// lock: anyone who sees `CustomerReached` can rely on the ledger already
    /// reflecting it.
    pub fn advance_and_notify(&self, caller: &ProviderCaller) -> QueueResult<QueueEntry> {
        self.authorize(caller)?;
        let venue_id = &caller.venue_id;
        let empty = || QueueError::EmptyQueue {
            venue_id: venue_id.clone(),
        };

        let lane = self.lane(venue_id)?.ok_or_else(empty)?;
        let mut lane = lock_lane(&lane)?;
        let entry = lane.ledger.advance().ok_or_else(empty)?;

        {
            let mut accounts = self.lock_accounts()?;
            let current = accounts.get(&entry.user_id).cloned().unwrap_or_default();
            match current.apply(QueueAction::Advance, venue_id, &lane.venue_name) {
                Ok(next) => store_account(&mut accounts, &entry.user_id, next),
                Err(e) => {
                    log::error!(
                        "Integrity fault: ledger {venue_id} held {} whose account is {}: {e}",
                        entry.user_id,
                        current.status
                    );
                    return Err(QueueError::internal(format!(
                        "ledger entry for {} had no matching queuing account",
                        entry.user_id
                    )));
                }
            }
        }

        self.emit(
            &mut lane,
            QueueEventKind::CustomerReached {
                user_id: entry.user_id.clone(),
                party_size: entry.party_size,
            },
        );
        log::debug!(
            "{} advanced {} at {venue_id} (sequence {})",
            caller.account_id,
            entry.user_id,
            entry.join_sequence
        );
        Ok(entry)
    }

    /// Forcibly end a customer's visit at the caller's venue
    ///
    /// Valid from any active status. Idempotent: absent users yield
    /// `Removal::Absent` without an event.
    pub fn remove_customer(&self, caller: &ProviderCaller, user_id: &UserId) -> QueueResult<Removal> {
        self.authorize(caller)?;
        let venue_id = &caller.venue_id;

        let Some(lane) = self.lane(venue_id)? else {
            return Ok(Removal::Absent);
        };
        let mut lane = lock_lane(&lane)?;

        {
            let mut accounts = self.lock_accounts()?;
            let current = accounts.get(user_id).cloned().unwrap_or_default();
            if !current.is_at(venue_id) {
                return Ok(Removal::Absent);
            }

            let next = current.apply(QueueAction::Remove, venue_id, &lane.venue_name)?;
            lane.ledger.remove(user_id);
            store_account(&mut accounts, user_id, next);
        }

        self.emit(
            &mut lane,
            QueueEventKind::CustomerRemoved {
                user_id: user_id.clone(),
            },
        );
        log::debug!("{} removed {user_id} from {venue_id}", caller.account_id);
        Ok(Removal::Removed)
    }

    // ---- reconciliation queries -------------------------------------------

    /// Consistent copy of a venue's line
    pub fn queue_snapshot(&self, venue_id: &VenueId) -> QueueResult<QueueSnapshot> {
        let lane = self.lane(venue_id)?.ok_or_else(|| QueueError::NotFound {
            entity: "venue",
            id: venue_id.to_string(),
        })?;
        let lane = lock_lane(&lane)?;

        Ok(QueueSnapshot {
            venue_id: venue_id.clone(),
            venue_name: lane.venue_name.clone(),
            entries: lane.ledger.snapshot(),
            total_party: lane.ledger.total_party(),
            event_sequence: lane.event_sequence,
        })
    }

    /// Authoritative status of an account; unknown users are not queued
    pub fn account_status(&self, user_id: &UserId) -> QueueResult<AccountQueueState> {
        let accounts = self.lock_accounts()?;
        Ok(accounts.get(user_id).cloned().unwrap_or_default())
    }

    /// Position and wait estimate for a queuing user
    pub fn queue_position(&self, user_id: &UserId) -> QueueResult<QueuePosition> {
        let not_queued = || QueueError::NotFound {
            entity: "queued user",
            id: user_id.to_string(),
        };

        let state = self.account_status(user_id)?;
        let venue_id = match (state.status, state.venue_id) {
            (QueueStatus::Queuing, Some(venue_id)) => venue_id,
            _ => return Err(not_queued()),
        };

        let lane = self.lane(&venue_id)?.ok_or_else(not_queued)?;
        let lane = lock_lane(&lane)?;
        // The account may have moved on between the two locks
        let position = lane.ledger.position_of(user_id).ok_or_else(not_queued)?;

        Ok(QueuePosition {
            venue_id,
            position,
            parties_ahead: position,
            people_ahead: lane.ledger.people_ahead(position),
            estimated_wait_minutes: (position as u64)
                .saturating_mul(self.settings.minutes_per_party),
        })
    }

    /// Venues that currently have a ledger
    #[cfg(test)]
    pub(crate) fn venue_ids(&self) -> QueueResult<Vec<VenueId>> {
        let venues = handle_rwlock_read(self.venues.read(), QueueError::internal)?;
        let mut ids: Vec<VenueId> = venues.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Number of accounts with an active visit
    #[cfg(test)]
    pub(crate) fn active_account_count(&self) -> QueueResult<usize> {
        Ok(self.lock_accounts()?.len())
    }

    // ---- internals --------------------------------------------------------

    fn transition(
        &self,
        venue_id: &VenueId,
        user_id: &UserId,
        action: QueueAction,
        make_event: impl FnOnce(UserId) -> QueueEventKind,
    ) -> QueueResult<AccountQueueState> {
        let Some(lane) = self.lane(venue_id)? else {
            let status = self.account_status(user_id)?.status;
            return Err(QueueError::InvalidTransition { status, action });
        };
        let mut lane = lock_lane(&lane)?;

        let next = {
            let mut accounts = self.lock_accounts()?;
            let current = accounts.get(user_id).cloned().unwrap_or_default();
            let next = current.apply(action, venue_id, &lane.venue_name)?;
            store_account(&mut accounts, user_id, next.clone());
            next
        };

        self.emit(&mut lane, make_event(user_id.clone()));
        log::debug!("{user_id} {action} at {venue_id} -> {}", next.status);
        Ok(next)
    }

    fn lane(&self, venue_id: &VenueId) -> QueueResult<Option<Arc<Mutex<VenueLane>>>> {
        let venues = handle_rwlock_read(self.venues.read(), QueueError::internal)?;
        Ok(venues.get(venue_id).cloned())
    }

    fn lane_or_create(&self, venue_id: &VenueId) -> QueueResult<Arc<Mutex<VenueLane>>> {
        if let Some(lane) = self.lane(venue_id)? {
            return Ok(lane);
        }

        let mut venues = handle_rwlock_write(self.venues.write(), QueueError::internal)?;
        let lane = venues.entry(venue_id.clone()).or_insert_with(|| {
            log::debug!("Creating ledger for venue {venue_id}");
            Arc::new(Mutex::new(VenueLane::new(
                venue_id.clone(),
                venue_id.to_string(),
            )))
        });
        Ok(Arc::clone(lane))
    }

    fn lock_accounts(&self) -> QueueResult<MutexGuard<'_, HashMap<UserId, AccountQueueState>>> {
        handle_mutex_poison(self.accounts.lock(), QueueError::internal)
    }

    /// Hand an event off for delivery; called with the venue lock held
    fn emit(&self, lane: &mut VenueLane, kind: QueueEventKind) {
        lane.event_sequence += 1;
        let event = QueueEvent::new(lane.ledger.venue_id().clone(), lane.event_sequence, kind);
        let name = event.kind.name();
        if self.events.send(event).is_err() {
            log::warn!(
                "Event stream closed; {name} for {} not delivered",
                lane.ledger.venue_id()
            );
        }
    }
}

fn lock_lane(lane: &Mutex<VenueLane>) -> QueueResult<MutexGuard<'_, VenueLane>> {
    log::trace!("Acquiring venue lock");
    handle_mutex_poison(lane.lock(), QueueError::internal)
}

/// Idle accounts are dropped from the table; absence means NOT_IN_QUEUE
fn store_account(
    accounts: &mut HashMap<UserId, AccountQueueState>,
    user_id: &UserId,
    state: AccountQueueState,
) {
    if state.is_active() {
        accounts.insert(user_id.clone(), state);
    } else {
        accounts.remove(user_id);
    }
}
