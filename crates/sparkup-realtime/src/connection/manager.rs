//! Connection manager: registration, replacement, and delivery.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

use sparkup_core::config::RealtimeConfig;
use sparkup_core::types::UserId;

use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;
use crate::session::RoomSessionManager;

use super::handle::{ConnectionHandle, ConnectionId, DEFAULT_DEVICE, DeliveryError};
use super::pool::ConnectionPool;

/// Result of writing one frame into a personal group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Connections the frame was queued to.
    pub delivered: u64,
    /// Connections that were closed or had a full buffer.
    pub failed: u64,
}

impl std::ops::AddAssign for DeliveryReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// Owns the live connections of this process.
///
/// Pool updates and personal-group joins/leaves happen under one lifecycle
/// lock, so a racing connect and disconnect always leave the pool and the
/// groups in agreement.
#[derive(Debug)]
pub struct ConnectionManager {
    pool: Arc<ConnectionPool>,
    sessions: Arc<RoomSessionManager>,
    metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
    lifecycle: Mutex<()>,
}

impl ConnectionManager {
    /// Creates a manager over an existing pool and session manager.
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        sessions: Arc<RoomSessionManager>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool,
            sessions,
            metrics,
            config,
            lifecycle: Mutex::new(()),
        }
    }

    /// Registers a connection for `user_id` and joins its personal group.
    ///
    /// An existing connection on the same device is closed first, as is the
    /// oldest connection once the per-user cap is reached. Returns the handle
    /// and the receiver the socket writer drains.
    pub async fn register(
        &self,
        user_id: UserId,
        device: Option<String>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let device = device
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, device, tx));

        let _guard = self.lifecycle.lock().await;

        if let Some(stale) = self.pool.find_device(&user_id, &handle.device) {
            warn!(
                conn_id = %stale.id,
                user_id = %user_id,
                device = %stale.device,
                "Replacing stale connection for device"
            );
            self.evict(&stale);
            self.metrics.connection_replaced();
        }

        let existing = self.pool.get_user_connections(&user_id);
        let excess = (existing.len() + 1).saturating_sub(self.config.max_connections_per_user);
        for oldest in existing.iter().take(excess) {
            warn!(
                conn_id = %oldest.id,
                user_id = %user_id,
                max = self.config.max_connections_per_user,
                "User at max connections, closing oldest"
            );
            self.evict(oldest);
            self.metrics.connection_replaced();
        }

        self.pool.add(handle.clone());
        self.sessions.join_personal(&handle);
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            device = %handle.device,
            verified = false,
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Removes a connection and its group memberships.
    ///
    /// No-op for an unknown or already replaced connection, so a late
    /// disconnect never touches the connection that replaced it.
    pub async fn unregister(&self, conn_id: &ConnectionId) -> bool {
        let _guard = self.lifecycle.lock().await;
        let Some(handle) = self.pool.get(conn_id) else {
            return false;
        };
        self.evict(&handle);
        info!(
            conn_id = %conn_id,
            user_id = %handle.user_id,
            "WebSocket connection unregistered"
        );
        true
    }

    /// Must be called with the lifecycle lock held.
    fn evict(&self, handle: &ConnectionHandle) {
        if self.pool.remove(&handle.id).is_some() {
            self.sessions.leave_all(handle.id);
            self.metrics.connection_closed();
        }
        handle.close();
    }

    /// Write an already serialized frame into a user's personal group.
    pub fn deliver_to_user(&self, user_id: UserId, frame: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for conn in self.sessions.group_members(user_id) {
            match conn.send(frame.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(conn_id = %conn.id, user_id = %user_id, error = %e, "Delivery failed");
                    report.failed += 1;
                }
            }
        }
        self.metrics.deliveries(report.delivered, report.failed);
        report
    }

    /// Send a frame to every connection of a user.
    pub fn send_to_user(&self, user_id: UserId, message: &OutboundMessage) -> DeliveryReport {
        match serde_json::to_string(message) {
            Ok(frame) => self.deliver_to_user(user_id, &frame),
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound message");
                DeliveryReport::default()
            }
        }
    }

    /// Send a frame to one connection.
    pub fn send_to_connection(
        &self,
        handle: &ConnectionHandle,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let frame = serde_json::to_string(message).map_err(|e| {
            error!(error = %e, "Failed to serialize outbound message");
            DeliveryError::Closed
        })?;
        let result = handle.send(frame);
        match result {
            Ok(()) => self.metrics.deliveries(1, 0),
            Err(_) => self.metrics.deliveries(0, 1),
        }
        result
    }

    /// Close and remove every connection.
    pub async fn close_all(&self) {
        let _guard = self.lifecycle.lock().await;
        let all = self.pool.all_connections();
        for conn in &all {
            self.evict(conn);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Whether the user has a live connection in their personal group.
    pub fn is_user_connected(&self, user_id: UserId) -> bool {
        self.sessions.is_online(user_id)
    }

    /// Total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Number of distinct connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Look up a live connection.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }
}
