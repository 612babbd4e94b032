//! Connection pool: every live connection, indexed by id and by user.

use std::sync::Arc;

use dashmap::DashMap;

use sparkup_core::types::UserId;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe pool of active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// User ID → handles in connect order (oldest first).
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → handle.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle.clone());
        self.by_user.entry(handle.user_id).or_default().push(handle);
    }

    /// Removes a connection by id. Returns `None` if it is not registered.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != *conn_id);
            if connections.is_empty() {
                drop(connections);
                self.by_user.remove_if(&handle.user_id, |_, conns| conns.is_empty());
            }
        }
        Some(handle)
    }

    /// Gets a connection by id.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// All connections of a user, oldest first.
    pub fn get_user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// The user's connection for `device`, if any.
    pub fn find_device(&self, user_id: &UserId, device: &str) -> Option<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .and_then(|conns| conns.iter().find(|c| c.device == device).cloned())
    }

    /// Total number of connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Number of distinct connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Every registered handle.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
