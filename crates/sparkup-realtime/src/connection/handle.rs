//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use sparkup_core::types::UserId;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Device key used when the client does not supply one.
pub const DEFAULT_DEVICE: &str = "default";

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection was closed or replaced.
    #[error("connection closed")]
    Closed,
    /// The outbound buffer is full; the frame was dropped.
    #[error("send buffer full")]
    BufferFull,
}

/// A handle to a single WebSocket connection.
///
/// Holds the sender half of the connection's outbound queue. The socket
/// writer task owns the receiver and stops when [`close`](Self::close) is
/// called or the handle is dropped.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Claimed user identity. Not verified.
    pub user_id: UserId,
    /// Client device key; one live connection per `(user_id, device)`.
    pub device: String,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<String>,
    alive: AtomicBool,
    closed: watch::Sender<bool>,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(user_id: UserId, device: String, sender: mpsc::Sender<String>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            user_id,
            device,
            connected_at: Utc::now(),
            sender,
            alive: AtomicBool::new(true),
            closed,
        }
    }

    /// Queue a text frame without waiting. A full buffer drops the frame.
    pub fn send(&self, frame: String) -> Result<(), DeliveryError> {
        if !self.is_alive() {
            return Err(DeliveryError::Closed);
        }
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                Err(DeliveryError::BufferFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(DeliveryError::Closed)
            }
        }
    }

    /// Check if the connection is still usable.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark the connection dead and signal its socket tasks to stop.
    pub fn close(&self) {
        self.mark_dead();
        self.closed.send_replace(true);
    }

    /// Receiver that flips to `true` once [`close`](Self::close) is called.
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}
