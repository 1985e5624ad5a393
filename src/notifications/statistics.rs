//! Per-connection delivery statistics

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Statistics tracking for a connection
pub struct ConnectionStatistics {
    connected_at: Instant,
    delivered: AtomicUsize,
    last_delivery_time: RwLock<Option<Instant>>,
}

impl Default for ConnectionStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatistics {
    pub fn new() -> Self {
        Self {
            connected_at: Instant::now(),
            delivered: AtomicUsize::new(0),
            last_delivery_time: RwLock::new(None),
        }
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut time) = self.last_delivery_time.write() {
            *time = Some(Instant::now());
        }
    }

    pub fn last_delivery_time(&self) -> Option<Instant> {
        *self.last_delivery_time.read().ok()?
    }
}
