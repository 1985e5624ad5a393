//! Grace timer
//!
//! Watches committed events and, for every `CustomerReached`, schedules the
//! `Timeout` transition after the grace period. A call that was answered in
//! the meantime (arrive, leave, remove) cancels its pending expiry; if one
//! still races through, the coordinator rejects it with `InvalidTransition`,
//! which is logged at debug.

use crate::notifications::api::{QueueEvent, QueueEventKind};
use crate::queue::api::{QueueCoordinator, QueueError, UserId, VenueId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinHandle, JoinSet};

type CallKey = (VenueId, UserId);

pub struct GraceTimer {
    coordinator: Arc<QueueCoordinator>,
    grace_period: Duration,
    /// Event sequence of the live call per customer
    pending: HashMap<CallKey, u64>,
}

impl GraceTimer {
    pub fn new(coordinator: Arc<QueueCoordinator>, grace_period: Duration) -> Self {
        Self {
            coordinator,
            grace_period,
            pending: HashMap::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Track one event; returns the key to schedule if it starts a call
    fn observe(&mut self, event: &QueueEvent) -> Option<(CallKey, u64)> {
        let key = (event.venue_id.clone(), event.kind.user_id().clone());
        match &event.kind {
            QueueEventKind::CustomerReached { .. } => {
                self.pending.insert(key.clone(), event.event_sequence);
                Some((key, event.event_sequence))
            }
            QueueEventKind::CustomerArrived { .. }
            | QueueEventKind::CustomerLeft { .. }
            | QueueEventKind::CustomerRemoved { .. }
            | QueueEventKind::ReachExpired { .. } => {
                if self.pending.remove(&key).is_some() {
                    log::trace!("Grace timer for {} at {} cancelled", key.1, key.0);
                }
                None
            }
            QueueEventKind::CustomerJoined { .. } | QueueEventKind::CustomerCheckedOut { .. } => {
                None
            }
        }
    }

    /// Fire the expiry if this timer still belongs to the live call
    fn expire(&mut self, key: CallKey, sequence: u64) {
        if self.pending.get(&key) != Some(&sequence) {
            return;
        }
        self.pending.remove(&key);

        let (venue_id, user_id) = key;
        match self.coordinator.expire_reached(&venue_id, &user_id) {
            Ok(_) => log::info!(
                "{user_id} did not arrive at {venue_id} within {}s; call expired",
                self.grace_period.as_secs()
            ),
            Err(QueueError::InvalidTransition { status, .. }) => {
                log::debug!("Expiry for {user_id} at {venue_id} skipped (now {status})");
            }
            Err(e) => log::warn!("Expiry for {user_id} at {venue_id} failed: {e}"),
        }
    }

    /// Run until the event tap closes or shutdown is signalled
    ///
    /// Pending expiries are dropped on shutdown.
    pub fn spawn(
        mut self,
        mut events: UnboundedReceiver<QueueEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timers: JoinSet<(CallKey, u64)> = JoinSet::new();

            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Some(event) => {
                            if let Some((key, sequence)) = self.observe(&event) {
                                let grace = self.grace_period;
                                timers.spawn(async move {
                                    tokio::time::sleep(grace).await;
                                    (key, sequence)
                                });
                            }
                        }
                        None => {
                            log::debug!("Event tap closed; grace timer stopping");
                            break;
                        }
                    },
                    Some(fired) = timers.join_next(), if !timers.is_empty() => {
                        match fired {
                            Ok((key, sequence)) => self.expire(key, sequence),
                            Err(e) => log::warn!("Grace timer task failed: {e}"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        log::debug!(
                            "Grace timer received shutdown signal ({} pending)",
                            self.pending.len()
                        );
                        break;
                    }
                }
            }

            timers.abort_all();
        })
    }
}
