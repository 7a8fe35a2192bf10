// Request bridge counters: dispatched, delivered, failed and dropped server calls.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStatsSnapshot {
    pub dispatched: u64,
    pub delivered: u64,
    pub transport_failures: u64,
    pub dropped: u64,
    pub in_flight: u64,
}

pub struct BridgeStats {
    dispatched: AtomicU64,
    delivered: AtomicU64,
    transport_failures: AtomicU64,
    dropped: AtomicU64,
    in_flight: AtomicU64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// A result reached the engine. `transport_failed` marks sentinel deliveries.
    pub fn record_delivered(&self, transport_failed: bool) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if transport_failed {
            self.transport_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A call or its result was discarded (shutdown, unknown token).
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finished(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}
