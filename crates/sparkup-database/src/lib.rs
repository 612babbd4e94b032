//! # sparkup-database
//!
//! The persistent store behind SparkUp chat. [`store`] defines the
//! contracts the chat core calls into; [`repositories`] implements them on
//! PostgreSQL and [`memory`] implements them in-process for development and
//! tests. [`provider::ChatStores`] picks a backend from configuration.

pub mod connection;
#[cfg(feature = "memory-store")]
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use provider::ChatStores;
pub use store::{MembershipStore, MessageStore, RoomStore};
