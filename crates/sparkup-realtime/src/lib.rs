//! # sparkup-realtime
//!
//! Real-time chat engine for SparkUp. Provides:
//!
//! - A connection registry keyed by user and device, with stale-session
//!   replacement and a per-user connection cap
//! - Personal delivery groups (`user:{id}`), one per online user
//! - The `send_message` dispatcher: validate, authorize against the
//!   membership cache, persist, then fan out to online members
//! - Engine-level counters

pub mod connection;
pub mod dispatch;
pub mod group;
pub mod message;
pub mod metrics;
pub mod server;
pub mod session;

pub use connection::manager::ConnectionManager;
pub use dispatch::dispatcher::MessageDispatcher;
pub use server::RealtimeEngine;
pub use session::RoomSessionManager;
