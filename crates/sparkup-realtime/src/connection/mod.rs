//! WebSocket connection management: handles, pool, lifecycle.

pub mod handle;
pub mod manager;
pub mod pool;

pub use handle::{ConnectionHandle, ConnectionId, DeliveryError};
pub use manager::ConnectionManager;
