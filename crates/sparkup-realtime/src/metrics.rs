//! Real-time engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters, updated lock-free.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    connections_replaced: AtomicU64,
    frames_received: AtomicU64,
    messages_dispatched: AtomicU64,
    messages_rejected: AtomicU64,
    persist_failures: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
}

impl RealtimeMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn connection_replaced(&self) {
        self.connections_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_dispatched(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn persist_failed(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of writing one frame to a set of connections.
    pub fn deliveries(&self, delivered: u64, failed: u64) {
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
        self.delivery_failures.fetch_add(failed, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_replaced: self.connections_replaced.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered.
    pub connections_total: u64,
    /// Connections currently registered.
    pub connections_active: u64,
    /// Connections evicted by a reconnect or the per-user cap.
    pub connections_replaced: u64,
    /// Inbound frames processed.
    pub frames_received: u64,
    /// Messages persisted and fanned out.
    pub messages_dispatched: u64,
    /// Sends answered with an error frame.
    pub messages_rejected: u64,
    /// Sends that failed to persist.
    pub persist_failures: u64,
    /// Frames queued to recipient connections.
    pub deliveries: u64,
    /// Frames that could not be queued.
    pub delivery_failures: u64,
}
